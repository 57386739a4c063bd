pub mod workflows;

use aws_durable_execution_sdk::{durable_execution, DurableContext};
use uuid::Uuid;

#[durable_execution]
pub async fn place_order(ctx: DurableContext, order: Order) -> Result<Receipt, Error> {
    let receipt_id = Uuid::new_v4();
    workflows::fulfil(&ctx, &order).await?;
    Ok(Receipt { id: receipt_id })
}

/// Runs as a step, outside the replayed orchestrator body.
pub async fn send_email(order: &Order) {
    let message_id = Uuid::new_v4();
    tokio::time::sleep(RETRY_DELAY).await;
}
