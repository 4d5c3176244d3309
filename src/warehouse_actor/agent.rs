use super::ledger::StockLedger;
use crate::error::KitchenError;
use crate::model::Product;
use crate::protocol::{capability, conversation, KitchenMessage, KitchenPayload};
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Owns the stock. Holds are keyed by the dish they were taken for, so a dish's
/// operations share one bag of products that is released or consumed as a whole.
pub struct WarehouseAgent {
    ledger: StockLedger<ActorAddress>,
}

impl WarehouseAgent {
    pub fn new(products: &[Product]) -> Self {
        Self {
            ledger: StockLedger::new(products),
        }
    }
}

#[async_trait]
impl Agent for WarehouseAgent {
    type Payload = KitchenPayload;
    type Timer = ();
    type Error = KitchenError;

    fn name(&self) -> String {
        "warehouse".into()
    }

    fn services(&self) -> Vec<ServiceDescription> {
        vec![ServiceDescription::new(capability::WAREHOUSE)]
    }

    fn pattern(&self) -> Pattern {
        Pattern::conversation(conversation::WAREHOUSE)
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, ()>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::StockQuery => {
                ctx.send(message.reply(
                    Performative::Inform,
                    KitchenPayload::StockLevels(self.ledger.levels()),
                ));
            }
            KitchenPayload::ReserveProducts { owner, needs } => {
                match self.ledger.reserve(owner, needs) {
                    Ok(lots) => {
                        debug!(%owner, lots, "Products reserved");
                        ctx.send(message.reply(
                            Performative::Confirm,
                            KitchenPayload::ProductsReserved,
                        ));
                    }
                    Err(class) => {
                        warn!(%owner, %class, "Products unavailable");
                        ctx.send(message.reply(
                            Performative::Disconfirm,
                            KitchenPayload::ProductsUnavailable { class },
                        ));
                    }
                }
            }
            KitchenPayload::ReleaseProducts { owner } => {
                let returned = self.ledger.release(owner);
                if returned > 0.0 {
                    info!(%owner, returned, "Products returned");
                }
            }
            KitchenPayload::ConsumeProducts { owner } => {
                let used = self.ledger.consume(owner);
                debug!(%owner, used, "Products consumed");
            }
            _ => debug!(kind = message.kind(), "Ignored"),
        }
        Ok(Flow::Continue)
    }
}
