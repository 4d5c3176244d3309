use crate::console::Tone;
use crate::error::KitchenError;
use crate::kitchen::{Kitchen, Locator};
use crate::model::{timestamp, OrderId, OrderedDish, VisitorOrder};
use crate::protocol::{capability, conversation, message, KitchenMessage, KitchenPayload};
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rand::Rng;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorTimer {
    /// Ask the order how long is left.
    TimeCheck,
    /// Changed my mind.
    Cancel,
    /// Waited long enough.
    GiveUp,
    /// Look the supervisor up again.
    Relocate,
}

#[derive(Debug)]
enum Stage {
    /// Looking for the supervisor.
    Arriving,
    Ordering { correlation: String },
    Waiting(Seated),
    /// Cancel sent; waiting for the order to wind down.
    Leaving(Seated),
}

#[derive(Debug)]
struct Seated {
    order: OrderId,
    address: ActorAddress,
    /// Dishes the supervisor confirmed.
    dishes: Vec<OrderedDish>,
    total: f64,
    started: NaiveDateTime,
    time_correlation: Option<String>,
}

/// A visitor from the schedule: orders, waits, sometimes cancels, then leaves.
pub struct VisitorAgent {
    kitchen: Kitchen,
    schedule: VisitorOrder,
    simulation: ActorAddress,
    locator: Locator,
    stage: Stage,
}

impl VisitorAgent {
    pub fn new(kitchen: Kitchen, schedule: VisitorOrder, simulation: ActorAddress) -> Self {
        Self {
            kitchen,
            schedule,
            simulation,
            locator: Locator::new(),
            stage: Stage::Arriving,
        }
    }

    fn seated(&mut self) -> Option<&mut Seated> {
        match &mut self.stage {
            Stage::Waiting(seated) | Stage::Leaving(seated) => Some(seated),
            Stage::Arriving | Stage::Ordering { .. } => None,
        }
    }

    fn seat(
        &mut self,
        order: OrderId,
        address: ActorAddress,
        dishes: Vec<OrderedDish>,
        total: f64,
        ctx: &mut AgentContext<KitchenPayload, VisitorTimer>,
    ) {
        let config = &self.kitchen.config;
        let (cancels, cancel_after, first_check) = {
            let mut rng = rand::rng();
            (
                rng.random_bool(config.order_cancellation_probability()),
                config.order_cancellation_delay(&mut rng),
                config.order_time_recognition_delay(&mut rng),
            )
        };
        if cancels {
            debug!(visitor = %self.schedule.visitor_name, ?cancel_after, "Will cancel");
            ctx.schedule(cancel_after, VisitorTimer::Cancel);
        }
        ctx.schedule(config.visitor_waiting_time(), VisitorTimer::GiveUp);
        ctx.schedule(first_check, VisitorTimer::TimeCheck);

        info!(visitor = %self.schedule.visitor_name, %order, total, "Order placed");
        self.stage = Stage::Waiting(Seated {
            order,
            address,
            dishes,
            total,
            started: timestamp::now(),
            time_correlation: None,
        });
    }

    fn ask_time(&mut self, ctx: &mut AgentContext<KitchenPayload, VisitorTimer>) {
        let correlation = ctx.new_correlation();
        let Stage::Waiting(seated) = &mut self.stage else {
            return;
        };
        ctx.send(
            message(Performative::Request, conversation::ORDER_TIME, KitchenPayload::TimeQuery)
                .to(seated.address.clone())
                .with_correlation(correlation.clone()),
        );
        seated.time_correlation = Some(correlation);
    }

    fn cancel(&mut self, reason: &str, ctx: &mut AgentContext<KitchenPayload, VisitorTimer>) {
        let stage = std::mem::replace(&mut self.stage, Stage::Arriving);
        self.stage = match stage {
            Stage::Waiting(seated) => {
                info!(visitor = %self.schedule.visitor_name, order = %seated.order, reason, "Cancelling order");
                ctx.cancel_timer(&VisitorTimer::TimeCheck);
                ctx.cancel_timer(&VisitorTimer::Cancel);
                ctx.cancel_timer(&VisitorTimer::GiveUp);
                ctx.send(
                    message(Performative::Cancel, conversation::ORDER_COOKING, KitchenPayload::Cancel)
                        .to(seated.address.clone()),
                );
                Stage::Leaving(seated)
            }
            other => other,
        };
    }

    async fn place_order(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, VisitorTimer>,
    ) -> Result<(), KitchenError> {
        let filter = ServiceDescription::new(capability::SUPERVISOR);
        let Some(supervisor) = self.locator.one(ctx, filter, VisitorTimer::Relocate).await? else {
            return Ok(());
        };
        let correlation = ctx.new_correlation();
        ctx.send(
            message(
                Performative::Request,
                conversation::ORDER_CREATION,
                KitchenPayload::PlaceOrder {
                    visitor: self.schedule.visitor_name.clone(),
                    dishes: self.schedule.dishes.clone(),
                },
            )
            .to(supervisor)
            .with_correlation(correlation.clone()),
        );
        debug!(visitor = %self.schedule.visitor_name, dishes = self.schedule.dishes.len(), "Ordering");
        self.stage = Stage::Ordering { correlation };
        Ok(())
    }

    /// Writes the visitor's report and tells the simulation.
    async fn leave(
        &mut self,
        dishes: Vec<OrderedDish>,
        total: f64,
        started: Option<NaiveDateTime>,
        ctx: &mut AgentContext<KitchenPayload, VisitorTimer>,
    ) -> Result<Flow, KitchenError> {
        let order = self.seated().map(|seated| seated.address.clone());
        let report = VisitorOrder {
            visitor_name: self.schedule.visitor_name.clone(),
            started,
            ended: Some(timestamp::now()),
            total,
            dishes,
        };
        self.kitchen.reports.visitors.write(report).await?;

        info!(visitor = %self.schedule.visitor_name, total, "Visitor left");
        ctx.send(
            message(
                Performative::Inform,
                conversation::SIMULATION,
                KitchenPayload::VisitorLeft {
                    visitor: self.schedule.visitor_name.clone(),
                    order,
                },
            )
            .to(self.simulation.clone()),
        );
        Ok(Flow::Stop)
    }
}

#[async_trait]
impl Agent for VisitorAgent {
    type Payload = KitchenPayload;
    type Timer = VisitorTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        format!("visitor-{}", self.schedule.visitor_name)
    }

    async fn on_start(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, VisitorTimer>,
    ) -> Result<Flow, KitchenError> {
        self.place_order(ctx).await?;
        Ok(Flow::Continue)
    }

    fn pattern(&self) -> Pattern {
        match &self.stage {
            Stage::Arriving => Pattern::nothing(),
            Stage::Ordering { correlation } => Pattern::correlation(correlation.clone()),
            Stage::Waiting(seated) => {
                let finished = Pattern::conversation(conversation::ORDER_COOKING)
                    .and(Pattern::kind("order-finished"));
                match &seated.time_correlation {
                    Some(correlation) => finished.or(Pattern::correlation(correlation.clone())),
                    None => finished,
                }
            }
            Stage::Leaving(_) => Pattern::conversation(conversation::ORDER_COOKING)
                .and(Pattern::kind("order-finished")),
        }
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, VisitorTimer>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::OrderAccepted {
                order,
                address,
                dishes,
                total,
            } => self.seat(*order, address.clone(), dishes.clone(), *total, ctx),
            KitchenPayload::OrderRejected => {
                self.kitchen.console.report(
                    Tone::Warning,
                    "VISITOR LEFT",
                    &[format!("{} found nothing to eat", self.schedule.visitor_name)],
                );
                let now = timestamp::now();
                return self.leave(Vec::new(), 0.0, Some(now), ctx).await;
            }
            KitchenPayload::Seconds(seconds) => {
                if let Stage::Waiting(seated) = &mut self.stage {
                    seated.time_correlation = None;
                    info!(visitor = %self.schedule.visitor_name, order = %seated.order, seconds, "Order time");
                    self.kitchen.console.report(
                        Tone::Info,
                        "ORDER TIME",
                        &[
                            format!("Visitor: {}", self.schedule.visitor_name),
                            format!("Ready in {seconds:.2}s"),
                        ],
                    );
                    let delay = self
                        .kitchen
                        .config
                        .order_time_recognition_delay(&mut rand::rng());
                    ctx.schedule(delay, VisitorTimer::TimeCheck);
                }
            }
            KitchenPayload::OrderFinished { served, cancelled } => {
                let Some(seated) = self.seated() else {
                    return Ok(Flow::Continue);
                };
                let started = seated.started;
                let dishes = seated.dishes.clone();
                // a cancelled order is not paid for, whatever was served before the cancel
                let total = if *cancelled { 0.0 } else { seated.total };
                debug!(visitor = %self.schedule.visitor_name, served = served.len(), of = dishes.len(), "Order over");
                ctx.cancel_timer(&VisitorTimer::TimeCheck);
                ctx.cancel_timer(&VisitorTimer::Cancel);
                ctx.cancel_timer(&VisitorTimer::GiveUp);
                return self.leave(dishes, total, Some(started), ctx).await;
            }
            _ => debug!(kind = message.kind(), "Ignored"),
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        timer: VisitorTimer,
        ctx: &mut AgentContext<KitchenPayload, VisitorTimer>,
    ) -> Result<Flow, KitchenError> {
        match timer {
            VisitorTimer::TimeCheck => self.ask_time(ctx),
            VisitorTimer::Cancel => self.cancel("changed mind", ctx),
            VisitorTimer::GiveUp => self.cancel("waited too long", ctx),
            VisitorTimer::Relocate => self.place_order(ctx).await?,
        }
        Ok(Flow::Continue)
    }
}
