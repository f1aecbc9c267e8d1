use tokio_util::sync::CancellationToken;

use invites_api_server::trigger_router;

use crate::config::TriggerArgs;
use crate::error::ServerError;

pub async fn run(args: TriggerArgs) -> Result<(), ServerError> {
    tracing::info!("register-invite starting");
    super::serve_until_signal(args.http.port, trigger_router(), CancellationToken::new()).await
}
