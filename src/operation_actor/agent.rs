use crate::config;
use crate::error::KitchenError;
use crate::kitchen::{Kitchen, Locator};
use crate::model::{
    CardId, CookId, EquipmentClass, EquipmentId, FailureReason, Operation, OperationId, Outcome,
    ProcessId,
};
use crate::protocol::{capability, conversation, message, Grant, KitchenMessage, KitchenPayload};
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Everything an operation agent is told by the process that spawns it.
#[derive(Debug, Clone)]
pub struct OperationTask {
    /// Owner of the warehouse holds: the dish being cooked.
    pub dish: ActorAddress,
    pub process: ActorAddress,
    pub process_id: ProcessId,
    pub report: OperationId,
    pub card: CardId,
    /// Position in the card, from 0.
    pub index: usize,
    pub operation: Operation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationTimer {
    /// Ask the resources again after a refusal.
    Backoff,
    /// Stop waiting for remaining-time replies.
    QueryTimeout,
    /// The work is done.
    Executed,
    /// Look the warehouse up again.
    Relocate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Equipment(EquipmentClass),
    Cook,
}

impl Target {
    fn conversation(self) -> &'static str {
        match self {
            Target::Equipment(_) => conversation::EQUIPMENT_RESERVING,
            Target::Cook => conversation::COOK_RESERVING,
        }
    }

    fn filter(self) -> ServiceDescription {
        match self {
            Target::Equipment(class) => ServiceDescription::new(capability::EQUIPMENT)
                .with(capability::ATTR_CLASS, class.0),
            Target::Cook => ServiceDescription::new(capability::COOK),
        }
    }
}

#[derive(Debug)]
enum Stage {
    Products {
        correlation: String,
    },
    Querying {
        target: Target,
        correlation: String,
        expected: usize,
        replies: Vec<(ActorAddress, f64)>,
    },
    Proposing {
        target: Target,
        correlation: String,
        to: ActorAddress,
    },
    Backoff(Target),
    /// Cook won; asking the unit to restart its countdown.
    Renewing {
        correlation: String,
    },
    Executing,
}

/// One step of one dish: take the products, win a unit and a cook, then work.
///
/// Negotiation never blocks: every round asks each candidate how long it is busy, proposes
/// to the one that frees first, and on refusal waits a fixed backoff before the next round.
pub struct OperationAgent {
    kitchen: Kitchen,
    task: OperationTask,
    warehouse: Option<ActorAddress>,
    locator: Locator,
    stage: Stage,
    equipment: Option<(ActorAddress, EquipmentId)>,
    cook: Option<(ActorAddress, CookId)>,
}

impl OperationAgent {
    pub fn new(kitchen: Kitchen, task: OperationTask) -> Self {
        Self {
            kitchen,
            task,
            warehouse: None,
            locator: Locator::new(),
            stage: Stage::Backoff(Target::Cook),
            equipment: None,
            cook: None,
        }
    }

    fn scaled_duration(&self) -> f64 {
        self.kitchen.config.scaled_seconds(self.task.operation.duration)
    }

    async fn advance(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<(), KitchenError> {
        match (self.task.operation.equipment_class, &self.equipment, &self.cook) {
            (Some(class), None, _) => self.query(Target::Equipment(class), ctx).await,
            (_, _, None) => self.query(Target::Cook, ctx).await,
            _ => self.execute(ctx).await,
        }
    }

    async fn query(
        &mut self,
        target: Target,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<(), KitchenError> {
        let candidates = ctx.lookup(target.filter()).await?;
        let correlation = ctx.new_correlation();
        let expected = ctx.send(
            message(
                Performative::Request,
                target.conversation(),
                KitchenPayload::RemainingTimeQuery,
            )
            .to_all(candidates)
            .with_correlation(correlation.clone()),
        );
        if expected == 0 {
            debug!(operation = %self.task.report, ?target, "Nobody to ask yet");
            self.back_off(target, ctx);
            return Ok(());
        }
        ctx.schedule(self.kitchen.config.staleness_window(), OperationTimer::QueryTimeout);
        self.stage = Stage::Querying {
            target,
            correlation,
            expected,
            replies: Vec::with_capacity(expected),
        };
        Ok(())
    }

    fn propose(&mut self, ctx: &mut AgentContext<KitchenPayload, OperationTimer>) {
        ctx.cancel_timer(&OperationTimer::QueryTimeout);
        if !matches!(self.stage, Stage::Querying { .. }) {
            return;
        }
        let Stage::Querying {
            target, replies, ..
        } = std::mem::replace(&mut self.stage, Stage::Backoff(Target::Cook))
        else {
            return;
        };
        let Some((to, seconds)) = replies
            .into_iter()
            .reduce(|best, next| if next.1 < best.1 { next } else { best })
        else {
            self.back_off(target, ctx);
            return;
        };

        debug!(operation = %self.task.report, resource = %to, seconds, "Proposing");
        let correlation = ctx.new_correlation();
        ctx.send(
            message(
                Performative::Propose,
                target.conversation(),
                KitchenPayload::Reserve {
                    seconds: self.task.operation.duration,
                },
            )
            .to(to.clone())
            .with_correlation(correlation.clone()),
        );
        self.stage = Stage::Proposing {
            target,
            correlation,
            to,
        };
    }

    fn back_off(&mut self, target: Target, ctx: &mut AgentContext<KitchenPayload, OperationTimer>) {
        ctx.schedule(self.kitchen.config.negotiation_backoff(), OperationTimer::Backoff);
        self.stage = Stage::Backoff(target);
    }

    async fn granted(
        &mut self,
        grant: Grant,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<(), KitchenError> {
        let to = match &self.stage {
            Stage::Proposing { to, .. } => to.clone(),
            Stage::Renewing { .. } => {
                debug!(operation = %self.task.report, "Unit still ours");
                return self.execute(ctx).await;
            }
            _ => return Ok(()),
        };
        match grant {
            Grant::Equipment(id) => self.equipment = Some((to, id)),
            Grant::Cook(id) => {
                self.cook = Some((to, id));
                // the unit's countdown started while the cook was being negotiated
                if let Some((unit, _)) = &self.equipment {
                    let correlation = ctx.new_correlation();
                    ctx.send(
                        message(
                            Performative::Propose,
                            conversation::EQUIPMENT_RESERVING,
                            KitchenPayload::Renew {
                                seconds: self.task.operation.duration,
                            },
                        )
                        .to(unit.clone())
                        .with_correlation(correlation.clone()),
                    );
                    self.stage = Stage::Renewing { correlation };
                    return Ok(());
                }
            }
        }
        self.advance(ctx).await
    }

    /// The unit ran out and went to someone else while the cook was negotiated: give the
    /// cook back and start over from the unit.
    async fn lapsed(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<(), KitchenError> {
        warn!(operation = %self.task.report, "Unit reservation lapsed, negotiating again");
        self.equipment = None;
        if let Some((cook, _)) = self.cook.take() {
            ctx.send(
                message(Performative::Cancel, conversation::COOK_RESERVING, KitchenPayload::Release)
                    .to(cook),
            );
        }
        self.advance(ctx).await
    }

    async fn execute(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<(), KitchenError> {
        let Some((_, cook)) = self.cook else {
            return Ok(());
        };
        let equipment = self.equipment.as_ref().map(|(_, id)| *id);
        self.kitchen
            .reports
            .operations
            .started(self.task.report, cook, equipment)
            .await?;

        let duration = config::seconds(self.scaled_duration());
        info!(
            operation = %self.task.report,
            process = %self.task.process_id,
            card = %self.task.card,
            step = self.task.index,
            %cook,
            ?equipment,
            ?duration,
            "Operation started"
        );
        ctx.schedule(duration, OperationTimer::Executed);
        self.stage = Stage::Executing;
        Ok(())
    }

    /// Gives back both reservations and any proposal still in flight.
    fn release_resources(&mut self, ctx: &mut AgentContext<KitchenPayload, OperationTimer>) {
        let mut holders = Vec::new();
        if let Some((unit, _)) = self.equipment.take() {
            holders.push((conversation::EQUIPMENT_RESERVING, unit));
        }
        if let Some((cook, _)) = self.cook.take() {
            holders.push((conversation::COOK_RESERVING, cook));
        }
        if let Stage::Proposing { target, to, .. } = &self.stage {
            holders.push((target.conversation(), to.clone()));
        }
        for (conversation, holder) in holders {
            ctx.send(message(Performative::Cancel, conversation, KitchenPayload::Release).to(holder));
        }
    }

    fn release_products(&self, ctx: &mut AgentContext<KitchenPayload, OperationTimer>) {
        if let Some(warehouse) = &self.warehouse {
            ctx.send(
                message(
                    Performative::Cancel,
                    conversation::WAREHOUSE,
                    KitchenPayload::ReleaseProducts {
                        owner: self.task.dish.clone(),
                    },
                )
                .to(warehouse.clone()),
            );
        }
    }

    async fn reserve_products(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<(), KitchenError> {
        let filter = ServiceDescription::new(capability::WAREHOUSE);
        let Some(warehouse) = self.locator.one(ctx, filter, OperationTimer::Relocate).await? else {
            return Ok(());
        };
        let correlation = ctx.new_correlation();
        ctx.send(
            message(
                Performative::Request,
                conversation::WAREHOUSE,
                KitchenPayload::ReserveProducts {
                    owner: self.task.dish.clone(),
                    needs: self.task.operation.products.clone(),
                },
            )
            .to(warehouse.clone())
            .with_correlation(correlation.clone()),
        );
        self.warehouse = Some(warehouse);
        self.stage = Stage::Products { correlation };
        Ok(())
    }

    async fn finish(
        &mut self,
        outcome: Outcome,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<Flow, KitchenError> {
        ctx.cancel_timer(&OperationTimer::Executed);
        ctx.cancel_timer(&OperationTimer::Backoff);
        ctx.cancel_timer(&OperationTimer::QueryTimeout);
        self.release_resources(ctx);
        if !outcome.is_served() {
            self.release_products(ctx);
        }
        self.kitchen.reports.operations.ended(self.task.report).await?;

        info!(
            operation = %self.task.report,
            process = %self.task.process_id,
            step = self.task.index,
            ?outcome,
            "Operation finished"
        );
        ctx.send(
            message(
                Performative::Inform,
                conversation::DISH_COOKING,
                KitchenPayload::Finished(outcome),
            )
            .to(self.task.process.clone()),
        );
        Ok(Flow::Stop)
    }
}

#[async_trait]
impl Agent for OperationAgent {
    type Payload = KitchenPayload;
    type Timer = OperationTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        self.task.report.to_string()
    }

    async fn on_start(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<Flow, KitchenError> {
        if self.task.operation.products.is_empty() {
            self.advance(ctx).await?;
        } else {
            self.reserve_products(ctx).await?;
        }
        Ok(Flow::Continue)
    }

    fn pattern(&self) -> Pattern {
        let always = Pattern::conversation(conversation::DISH_COOKING)
            .and(Pattern::kind("cancel"))
            .or(Pattern::conversation(conversation::ORDER_TIME).and(Pattern::kind("time-query")));
        let stage = match &self.stage {
            Stage::Products { correlation }
            | Stage::Proposing { correlation, .. }
            | Stage::Renewing { correlation } => {
                Pattern::correlation(correlation.clone())
            }
            Stage::Querying { correlation, .. } => {
                Pattern::correlation(correlation.clone()).and(Pattern::kind("remaining-time"))
            }
            Stage::Backoff(_) | Stage::Executing => Pattern::nothing(),
        };
        always.or(stage)
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::Cancel => {
                info!(operation = %self.task.report, "Cancelled");
                return self.finish(Outcome::Cancelled, ctx).await;
            }
            KitchenPayload::TimeQuery => {
                let seconds = match self.stage {
                    Stage::Executing => ctx
                        .time_until(&OperationTimer::Executed)
                        .map_or(0.0, |left| left.as_secs_f64()),
                    _ => self.scaled_duration(),
                };
                ctx.send(message.reply(Performative::Inform, KitchenPayload::Seconds(seconds)));
            }
            KitchenPayload::ProductsReserved => self.advance(ctx).await?,
            KitchenPayload::ProductsUnavailable { class } => {
                warn!(operation = %self.task.report, %class, "Warehouse cannot cover the operation");
                return self
                    .finish(Outcome::Failed(FailureReason::InsufficientProducts(*class)), ctx)
                    .await;
            }
            KitchenPayload::RemainingTime { seconds, .. } => {
                if let (Stage::Querying { expected, replies, .. }, Some(sender)) =
                    (&mut self.stage, message.sender())
                {
                    replies.push((sender.clone(), *seconds));
                    if replies.len() >= *expected {
                        self.propose(ctx);
                    }
                }
            }
            KitchenPayload::Granted(grant) => self.granted(*grant, ctx).await?,
            KitchenPayload::Refused => match self.stage {
                Stage::Proposing { target, .. } => self.back_off(target, ctx),
                Stage::Renewing { .. } => self.lapsed(ctx).await?,
                _ => {}
            },
            _ => debug!(kind = message.kind(), "Ignored"),
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        timer: OperationTimer,
        ctx: &mut AgentContext<KitchenPayload, OperationTimer>,
    ) -> Result<Flow, KitchenError> {
        match timer {
            OperationTimer::Backoff => {
                if let Stage::Backoff(target) = self.stage {
                    self.query(target, ctx).await?;
                }
            }
            OperationTimer::QueryTimeout => self.propose(ctx),
            OperationTimer::Executed => return self.finish(Outcome::Served, ctx).await,
            OperationTimer::Relocate => self.reserve_products(ctx).await?,
        }
        Ok(Flow::Continue)
    }
}
