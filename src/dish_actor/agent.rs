use crate::error::KitchenError;
use crate::kitchen::{Kitchen, Locator};
use crate::model::{CardId, OrderId, OrderedDish, Outcome};
use crate::process_actor::ProcessAgent;
use crate::protocol::{
    capability, conversation, message, DishStatusReport, KitchenMessage, KitchenPayload,
};
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DishTimer {
    /// Look the warehouse or the order up again.
    Relocate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DishState {
    NotCooking,
    Cooking,
    /// Cancel forwarded to the process, waiting for it to stop.
    Cancelling,
    Finished(Outcome),
}

/// One ordered dish, from the moment the order is accepted until it is dismissed.
///
/// ```text
/// NotCooking --start--> Cooking --process done--> Finished(Served | Failed)
///     |                    |
///     +------cancel--------+--> Cancelling --process stopped--> Finished(Cancelled)
/// ```
pub struct DishAgent {
    kitchen: Kitchen,
    order_id: OrderId,
    ordered: OrderedDish,
    card: CardId,
    priority: u32,
    state: DishState,
    process: Option<ActorAddress>,
    order: Option<ActorAddress>,
    warehouse: Option<ActorAddress>,
    locator: Locator,
    /// Final outcome not yet passed on to the warehouse and the order.
    unreported: Option<Outcome>,
    /// The order's time query, forwarded to the process.
    time_request: Option<(KitchenMessage, String)>,
}

impl DishAgent {
    pub fn new(kitchen: Kitchen, order_id: OrderId, ordered: OrderedDish, card: CardId) -> Self {
        Self {
            kitchen,
            order_id,
            ordered,
            card,
            priority: 1,
            state: DishState::NotCooking,
            process: None,
            order: None,
            warehouse: None,
            locator: Locator::new(),
            unreported: None,
            time_request: None,
        }
    }

    fn status(&self) -> DishStatusReport {
        match self.state {
            DishState::NotCooking => DishStatusReport::Waiting {
                card: self.card,
                priority: self.priority,
            },
            DishState::Cooking | DishState::Cancelling => DishStatusReport::Cooking,
            DishState::Finished(_) => DishStatusReport::Done,
        }
    }

    fn start(&mut self, ctx: &mut AgentContext<KitchenPayload, DishTimer>) {
        if self.state != DishState::NotCooking {
            return;
        }
        info!(dish = %self.ordered, order = %self.order_id, priority = self.priority, "Cooking started");
        self.process = Some(ctx.spawn(ProcessAgent::new(
            self.kitchen.clone(),
            ctx.address().clone(),
            self.ordered,
            self.card,
        )));
        self.state = DishState::Cooking;
    }

    async fn cancel(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, DishTimer>,
    ) -> Result<(), KitchenError> {
        match self.state {
            DishState::NotCooking => self.settle(Outcome::Cancelled, ctx).await,
            DishState::Cooking => {
                self.tell_process(KitchenPayload::Cancel, ctx);
                self.state = DishState::Cancelling;
                Ok(())
            }
            DishState::Cancelling | DishState::Finished(_) => Ok(()),
        }
    }

    fn tell_process(&self, payload: KitchenPayload, ctx: &mut AgentContext<KitchenPayload, DishTimer>) {
        if let Some(process) = &self.process {
            ctx.send(
                message(Performative::Cancel, conversation::DISH_COOKING, payload)
                    .to(process.clone()),
            );
        }
    }

    /// Enters the final state, then tells the warehouse and the order.
    async fn settle(
        &mut self,
        outcome: Outcome,
        ctx: &mut AgentContext<KitchenPayload, DishTimer>,
    ) -> Result<(), KitchenError> {
        if let Some((request, _)) = self.time_request.take() {
            ctx.send(request.reply(Performative::Inform, KitchenPayload::Seconds(0.0)));
        }
        self.state = DishState::Finished(outcome.clone());
        info!(dish = %self.ordered, order = %self.order_id, ?outcome, "Dish finished");
        self.unreported = Some(outcome);
        self.report(ctx).await
    }

    /// Passes the final outcome on once the warehouse (for a served dish) and the order are
    /// known, then leaves the directory. Retried from [`DishTimer::Relocate`].
    async fn report(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, DishTimer>,
    ) -> Result<(), KitchenError> {
        let Some(outcome) = self.unreported.clone() else {
            return Ok(());
        };
        if outcome.is_served() && self.warehouse.is_none() {
            let filter = ServiceDescription::new(capability::WAREHOUSE);
            self.warehouse = self.locator.one(ctx, filter, DishTimer::Relocate).await?;
            if self.warehouse.is_none() {
                return Ok(());
            }
        }
        if self.order.is_none() {
            let filter =
                ServiceDescription::new(capability::ORDER).with(capability::ATTR_ID, self.order_id.0);
            self.order = self.locator.one(ctx, filter, DishTimer::Relocate).await?;
            if self.order.is_none() {
                return Ok(());
            }
        }
        self.unreported = None;

        if let (true, Some(warehouse)) = (outcome.is_served(), &self.warehouse) {
            ctx.send(
                message(
                    Performative::Inform,
                    conversation::WAREHOUSE,
                    KitchenPayload::ConsumeProducts {
                        owner: ctx.address().clone(),
                    },
                )
                .to(warehouse.clone()),
            );
        }
        if let Some(order) = &self.order {
            ctx.send(
                message(
                    Performative::Inform,
                    conversation::ORDER_COOKING,
                    KitchenPayload::DishFinished {
                        dish: self.ordered,
                        outcome,
                    },
                )
                .to(order.clone()),
            );
        }

        // nothing left to schedule: drop out of the supervisor's view
        ctx.fabric().directory().deregister(ctx.address().clone()).await?;
        Ok(())
    }

    fn answer_time(
        &mut self,
        request: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, DishTimer>,
    ) {
        match (&self.state, &self.process) {
            (DishState::NotCooking, _) => {
                ctx.send(request.reply(Performative::Inform, KitchenPayload::DishStatus(self.status())));
            }
            (DishState::Cooking, Some(process)) => {
                let correlation = ctx.new_correlation();
                let asked = ctx.send(
                    message(Performative::Request, conversation::ORDER_TIME, KitchenPayload::TimeQuery)
                        .to(process.clone())
                        .with_correlation(correlation.clone()),
                );
                if asked > 0 {
                    self.time_request = Some((request.clone(), correlation));
                } else {
                    ctx.send(request.reply(Performative::Inform, KitchenPayload::Seconds(0.0)));
                }
            }
            _ => {
                ctx.send(request.reply(Performative::Inform, KitchenPayload::Seconds(0.0)));
            }
        }
    }
}

#[async_trait]
impl Agent for DishAgent {
    type Payload = KitchenPayload;
    type Timer = DishTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        self.ordered.to_string()
    }

    fn services(&self) -> Vec<ServiceDescription> {
        vec![ServiceDescription::new(capability::DISH).with(capability::ATTR_ORDER, self.order_id.0)]
    }

    fn pattern(&self) -> Pattern {
        let scheduling = Pattern::conversation(conversation::KITCHEN_MANAGEMENT);
        let cancel = Pattern::conversation(conversation::ORDER_COOKING).and(Pattern::kind("cancel"));
        let process_done =
            Pattern::conversation(conversation::DISH_COOKING).and(Pattern::kind("finished"));
        let time_query = Pattern::performative(Performative::Request)
            .and(Pattern::conversation(conversation::ORDER_TIME));
        let dismiss = Pattern::conversation(conversation::DISMISS);

        match (&self.state, &self.time_request) {
            (DishState::Cancelling, _) => Pattern::any_of([scheduling, cancel, process_done]),
            (DishState::Cooking, Some((_, correlation))) => Pattern::any_of([
                scheduling,
                cancel,
                process_done,
                dismiss,
                Pattern::correlation(correlation.clone()).and(Pattern::kind("seconds")),
            ]),
            _ => Pattern::any_of([scheduling, cancel, process_done, time_query, dismiss]),
        }
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, DishTimer>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::DishStatusQuery => {
                ctx.send(message.reply(Performative::Inform, KitchenPayload::DishStatus(self.status())));
            }
            KitchenPayload::StartCooking => self.start(ctx),
            KitchenPayload::IncreasePriority(by) => {
                if self.state == DishState::NotCooking {
                    self.priority = self.priority.saturating_add(*by);
                    debug!(dish = %self.ordered, priority = self.priority, "Priority raised");
                }
            }
            KitchenPayload::Cancel => self.cancel(ctx).await?,
            KitchenPayload::Finished(outcome) => {
                self.process = None;
                let outcome = match (&self.state, outcome) {
                    (_, Outcome::Served) => Outcome::Served,
                    (DishState::Cancelling, _) => Outcome::Cancelled,
                    (_, other) => other.clone(),
                };
                self.settle(outcome, ctx).await?;
            }
            KitchenPayload::TimeQuery => self.answer_time(message, ctx),
            KitchenPayload::Seconds(seconds) => {
                if let Some((request, _)) = self.time_request.take() {
                    ctx.send(request.reply(Performative::Inform, KitchenPayload::Seconds(*seconds)));
                }
            }
            KitchenPayload::Dismiss => {
                if self.state == DishState::Cooking {
                    self.tell_process(KitchenPayload::Cancel, ctx);
                }
                debug!(dish = %self.ordered, "Dismissed");
                return Ok(Flow::Stop);
            }
            _ => debug!(kind = message.kind(), "Ignored"),
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        _timer: DishTimer,
        ctx: &mut AgentContext<KitchenPayload, DishTimer>,
    ) -> Result<Flow, KitchenError> {
        self.report(ctx).await?;
        Ok(Flow::Continue)
    }
}
