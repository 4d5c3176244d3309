use crate::error::KitchenError;
use crate::kitchen::{Kitchen, Locator};
use crate::model::{CardId, OrderedDish, Outcome, ProcessId};
use crate::operation_actor::{OperationAgent, OperationTask};
use crate::protocol::{capability, conversation, message, KitchenMessage, KitchenPayload};
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessTimer {
    /// Look the menu and the warehouse up again.
    Relocate,
}

/// An outstanding time query: the live operation's share and the menu's estimate for the
/// rest of the card arrive separately.
#[derive(Debug)]
struct TimeRound {
    request: KitchenMessage,
    correlation: String,
    current: Option<f64>,
    rest: Option<f64>,
}

impl TimeRound {
    fn total(&self) -> Option<f64> {
        Some(self.current? + self.rest?)
    }
}

/// Runs a dish card's operations strictly one after another.
pub struct ProcessAgent {
    kitchen: Kitchen,
    dish: ActorAddress,
    ordered: OrderedDish,
    card: CardId,
    id: Option<ProcessId>,
    menu: Option<ActorAddress>,
    warehouse: Option<ActorAddress>,
    locator: Locator,
    /// Index of the next operation to spawn.
    next: usize,
    live: Option<ActorAddress>,
    cancelling: bool,
    time: Option<TimeRound>,
}

impl ProcessAgent {
    pub fn new(kitchen: Kitchen, dish: ActorAddress, ordered: OrderedDish, card: CardId) -> Self {
        Self {
            kitchen,
            dish,
            ordered,
            card,
            id: None,
            menu: None,
            warehouse: None,
            locator: Locator::new(),
            next: 0,
            live: None,
            cancelling: false,
            time: None,
        }
    }

    fn id(&self) -> Result<ProcessId, KitchenError> {
        self.id.ok_or_else(|| {
            KitchenError::ActorCommunicationError(format!("{} has no process record", self.ordered))
        })
    }

    /// Spawns the next operation, or finishes once the card is exhausted.
    async fn spawn_next(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, ProcessTimer>,
    ) -> Result<Flow, KitchenError> {
        let data = &self.kitchen.data;
        let card = data.card(self.card).ok_or(KitchenError::UnknownCard(self.card))?;
        let Some(operation) = card.operations.get(self.next).cloned() else {
            return self.finish(Outcome::Served, ctx).await;
        };

        let process_id = self.id()?;
        let reports = &self.kitchen.reports;
        let report = reports.operations.open(process_id, self.card).await?;
        reports.processes.add_operation(process_id, report).await?;

        let task = OperationTask {
            dish: self.dish.clone(),
            process: ctx.address().clone(),
            process_id,
            report,
            card: self.card,
            index: self.next,
            operation,
        };
        debug!(process = %process_id, operation = %report, index = self.next, "Spawning operation");
        self.live = Some(ctx.spawn(OperationAgent::new(self.kitchen.clone(), task)));
        self.next += 1;
        Ok(Flow::Continue)
    }

    async fn finish(
        &mut self,
        outcome: Outcome,
        ctx: &mut AgentContext<KitchenPayload, ProcessTimer>,
    ) -> Result<Flow, KitchenError> {
        let process_id = self.id()?;
        self.kitchen.reports.processes.ended(process_id).await?;
        if outcome == Outcome::Cancelled {
            if let Some(warehouse) = &self.warehouse {
                ctx.send(
                    message(
                        Performative::Cancel,
                        conversation::WAREHOUSE,
                        KitchenPayload::ReleaseProducts {
                            owner: self.dish.clone(),
                        },
                    )
                    .to(warehouse.clone()),
                );
            }
        }
        if let Some(round) = self.time.take() {
            ctx.send(round.request.reply(Performative::Inform, KitchenPayload::Seconds(0.0)));
        }

        info!(process = %process_id, dish = %self.ordered, ?outcome, "Process finished");
        ctx.send(
            message(
                Performative::Inform,
                conversation::DISH_COOKING,
                KitchenPayload::Finished(outcome),
            )
            .to(self.dish.clone()),
        );
        Ok(Flow::Stop)
    }

    /// Finds the menu and the warehouse, then starts the first operation.
    async fn begin(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, ProcessTimer>,
    ) -> Result<Flow, KitchenError> {
        if self.menu.is_none() {
            let filter = ServiceDescription::new(capability::MENU);
            self.menu = self.locator.one(ctx, filter, ProcessTimer::Relocate).await?;
        }
        if self.menu.is_some() && self.warehouse.is_none() {
            let filter = ServiceDescription::new(capability::WAREHOUSE);
            self.warehouse = self.locator.one(ctx, filter, ProcessTimer::Relocate).await?;
        }
        if self.warehouse.is_none() {
            return Ok(Flow::Continue);
        }
        self.spawn_next(ctx).await
    }

    fn operation_count(&self) -> usize {
        self.kitchen
            .data
            .card(self.card)
            .map_or(0, |card| card.operations.len())
    }

    /// Forwards a cancel to the live operation; false when none is running.
    fn cancel_live(&self, ctx: &mut AgentContext<KitchenPayload, ProcessTimer>) -> bool {
        let Some(live) = &self.live else {
            return false;
        };
        debug!(dish = %self.ordered, operation = %live, "Cancelling live operation");
        ctx.send(
            message(Performative::Cancel, conversation::DISH_COOKING, KitchenPayload::Cancel)
                .to(live.clone()),
        ) > 0
    }

    fn start_time_round(
        &mut self,
        request: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, ProcessTimer>,
    ) {
        let correlation = ctx.new_correlation();
        let asked_live = self.live.clone().is_some_and(|live| {
            ctx.send(
                message(Performative::Request, conversation::ORDER_TIME, KitchenPayload::TimeQuery)
                    .to(live)
                    .with_correlation(correlation.clone()),
            ) > 0
        });
        let asked_menu = self.menu.clone().is_some_and(|menu| {
            ctx.send(
                message(
                    Performative::Request,
                    conversation::TIME_CALCULATION,
                    KitchenPayload::EstimateOperations {
                        card: self.card,
                        skip: self.next,
                    },
                )
                .to(menu)
                .with_correlation(correlation.clone()),
            ) > 0
        });

        let round = TimeRound {
            request: request.clone(),
            correlation,
            current: (!asked_live).then_some(0.0),
            rest: (!asked_menu).then_some(0.0),
        };
        self.time = Some(round);
        self.answer_time_if_ready(ctx);
    }

    fn answer_time_if_ready(&mut self, ctx: &mut AgentContext<KitchenPayload, ProcessTimer>) {
        let Some(total) = self.time.as_ref().and_then(TimeRound::total) else {
            return;
        };
        if let Some(round) = self.time.take() {
            ctx.send(round.request.reply(Performative::Inform, KitchenPayload::Seconds(total)));
        }
    }
}

#[async_trait]
impl Agent for ProcessAgent {
    type Payload = KitchenPayload;
    type Timer = ProcessTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        format!("process-{}", self.ordered)
    }

    async fn on_start(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, ProcessTimer>,
    ) -> Result<Flow, KitchenError> {
        self.id = Some(self.kitchen.reports.processes.open(self.ordered).await?);
        self.begin(ctx).await
    }

    fn pattern(&self) -> Pattern {
        let cooking = Pattern::conversation(conversation::DISH_COOKING)
            .and(Pattern::any_of([Pattern::kind("finished"), Pattern::kind("cancel")]));
        let time = match &self.time {
            None => Pattern::performative(Performative::Request)
                .and(Pattern::conversation(conversation::ORDER_TIME)),
            Some(round) => {
                Pattern::correlation(round.correlation.clone()).and(Pattern::kind("seconds"))
            }
        };
        cooking.or(time)
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, ProcessTimer>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::Finished(outcome) => {
                self.live = None;
                if let Some(round) = self.time.as_mut() {
                    round.current.get_or_insert(0.0);
                }
                return match outcome {
                    Outcome::Served if !self.cancelling => self.spawn_next(ctx).await,
                    // the cancel crossed the last operation's completion: the dish is ready
                    Outcome::Served if self.next >= self.operation_count() => {
                        self.finish(Outcome::Served, ctx).await
                    }
                    Outcome::Served => self.finish(Outcome::Cancelled, ctx).await,
                    other => self.finish(other.clone(), ctx).await,
                };
            }
            KitchenPayload::Cancel => {
                self.cancelling = true;
                if !self.cancel_live(ctx) {
                    return self.finish(Outcome::Cancelled, ctx).await;
                }
            }
            KitchenPayload::TimeQuery => self.start_time_round(message, ctx),
            KitchenPayload::Seconds(seconds) => {
                let from_menu = message.conversation() == conversation::TIME_CALCULATION;
                if let Some(round) = self.time.as_mut() {
                    if from_menu {
                        round.rest = Some(*seconds);
                    } else {
                        round.current = Some(*seconds);
                    }
                }
                self.answer_time_if_ready(ctx);
            }
            _ => debug!(kind = message.kind(), "Ignored"),
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        _timer: ProcessTimer,
        ctx: &mut AgentContext<KitchenPayload, ProcessTimer>,
    ) -> Result<Flow, KitchenError> {
        self.begin(ctx).await
    }
}
