use aws_durable_execution_sdk::DurableContext;

pub async fn fulfil(ctx: &DurableContext, order: &Order) -> Result<(), Error> {
    helpers::backoff(order.attempts);
    reserve(order);
    Ok(())
}

// durable-lint: deterministic
fn reserve(order: &Order) {
    let token = uuid::Uuid::new_v4();
}
