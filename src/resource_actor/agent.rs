use crate::config;
use crate::error::KitchenError;
use crate::model::{CookId, EquipmentClass, EquipmentId};
use crate::protocol::{capability, conversation, Grant, KitchenMessage, KitchenPayload};
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use tracing::{debug, info};

/// Which reservable thing this agent stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cook(CookId),
    Equipment { id: EquipmentId, class: EquipmentClass },
}

impl ResourceKind {
    fn conversation(&self) -> &'static str {
        match self {
            ResourceKind::Cook(_) => conversation::COOK_RESERVING,
            ResourceKind::Equipment { .. } => conversation::EQUIPMENT_RESERVING,
        }
    }

    fn grant(&self) -> Grant {
        match *self {
            ResourceKind::Cook(id) => Grant::Cook(id),
            ResourceKind::Equipment { id, .. } => Grant::Equipment(id),
        }
    }

    fn equipment_class(&self) -> Option<EquipmentClass> {
        match *self {
            ResourceKind::Cook(_) => None,
            ResourceKind::Equipment { class, .. } => Some(class),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceTimer {
    /// The current reservation runs out.
    Expiry,
}

/// A cook or an equipment unit: free, or reserved by exactly one holder until the
/// reservation runs out or the holder gives it back.
pub struct ResourceAgent {
    kind: ResourceKind,
    factor: f64,
    holder: Option<ActorAddress>,
}

impl ResourceAgent {
    pub fn new(kind: ResourceKind, factor: f64) -> Self {
        Self {
            kind,
            factor,
            holder: None,
        }
    }

    fn remaining(&self, ctx: &AgentContext<KitchenPayload, ResourceTimer>) -> f64 {
        ctx.time_until(&ResourceTimer::Expiry)
            .map_or(0.0, |left| left.as_secs_f64())
    }
}

#[async_trait]
impl Agent for ResourceAgent {
    type Payload = KitchenPayload;
    type Timer = ResourceTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        match self.kind {
            ResourceKind::Cook(id) => id.to_string(),
            ResourceKind::Equipment { id, .. } => id.to_string(),
        }
    }

    fn services(&self) -> Vec<ServiceDescription> {
        let service = match self.kind {
            ResourceKind::Cook(id) => {
                ServiceDescription::new(capability::COOK).with(capability::ATTR_ID, id.0)
            }
            ResourceKind::Equipment { id, class } => ServiceDescription::new(capability::EQUIPMENT)
                .with(capability::ATTR_ID, id.0)
                .with(capability::ATTR_CLASS, class.0),
        };
        vec![service]
    }

    fn pattern(&self) -> Pattern {
        Pattern::conversation(self.kind.conversation())
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, ResourceTimer>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::RemainingTimeQuery => {
                ctx.send(message.reply(
                    Performative::Inform,
                    KitchenPayload::RemainingTime {
                        seconds: self.remaining(ctx),
                        equipment_class: self.kind.equipment_class(),
                    },
                ));
            }
            KitchenPayload::Reserve { seconds } => match (self.holder.is_none(), message.sender()) {
                (true, Some(requester)) => {
                    let duration = config::seconds(seconds * self.factor);
                    info!(resource = %ctx.address(), holder = %requester, ?duration, "Reserved");
                    self.holder = Some(requester.clone());
                    ctx.schedule(duration, ResourceTimer::Expiry);
                    ctx.send(message.reply(
                        Performative::AcceptProposal,
                        KitchenPayload::Granted(self.kind.grant()),
                    ));
                }
                _ => {
                    debug!(resource = %ctx.address(), "Proposal refused");
                    ctx.send(message.reply(Performative::RejectProposal, KitchenPayload::Refused));
                }
            },
            KitchenPayload::Renew { seconds } => {
                let ours = message.sender().is_some()
                    && (self.holder.is_none() || self.holder.as_ref() == message.sender());
                if ours {
                    let duration = config::seconds(seconds * self.factor);
                    debug!(resource = %ctx.address(), ?duration, "Reservation renewed");
                    self.holder = message.sender().cloned();
                    ctx.cancel_timer(&ResourceTimer::Expiry);
                    ctx.schedule(duration, ResourceTimer::Expiry);
                    ctx.send(message.reply(
                        Performative::AcceptProposal,
                        KitchenPayload::Granted(self.kind.grant()),
                    ));
                } else {
                    debug!(resource = %ctx.address(), "Renewal refused, held by someone else");
                    ctx.send(message.reply(Performative::RejectProposal, KitchenPayload::Refused));
                }
            }
            KitchenPayload::Release => {
                if self.holder.is_some() && self.holder.as_ref() == message.sender() {
                    info!(resource = %ctx.address(), "Released early");
                    self.holder = None;
                    ctx.cancel_timer(&ResourceTimer::Expiry);
                } else {
                    debug!(resource = %ctx.address(), "Release from a non-holder ignored");
                }
            }
            _ => debug!(kind = message.kind(), "Ignored"),
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        _timer: ResourceTimer,
        ctx: &mut AgentContext<KitchenPayload, ResourceTimer>,
    ) -> Result<Flow, KitchenError> {
        debug!(resource = %ctx.address(), "Reservation expired");
        self.holder = None;
        Ok(Flow::Continue)
    }
}
