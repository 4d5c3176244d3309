use crate::console::Tone;
use crate::error::KitchenError;
use crate::kitchen::{Kitchen, Locator};
use crate::model::{CardId, OrderId, OrderedDish, Outcome};
use crate::protocol::{
    capability, conversation, message, DishStatusReport, KitchenMessage, KitchenPayload,
};
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTimer {
    /// Some dishes were not registered yet when the cancel went out.
    CancelRetry,
    /// Stop waiting for the dishes' time answers.
    TimeRoundTimeout,
    /// Look the menu up again for the time round in progress.
    Relocate,
}

/// Remaining time of the order: cooking dishes report seconds, idle dishes report their
/// card, and the idle cards are estimated together by the menu.
#[derive(Debug)]
struct TimeRound {
    request: KitchenMessage,
    correlation: String,
    expected: usize,
    answered: HashSet<ActorAddress>,
    seconds: f64,
    idle: Vec<CardId>,
    asked_menu: bool,
}

/// Collects the outcome of every dish of one order and reports to the visitor.
pub struct OrderAgent {
    kitchen: Kitchen,
    id: OrderId,
    visitor: String,
    visitor_address: ActorAddress,
    dishes: Vec<OrderedDish>,
    outcomes: HashMap<u32, Outcome>,
    /// Dishes that reported, so they can be dismissed after leaving the directory.
    reported: Vec<ActorAddress>,
    cancelled: bool,
    finished: bool,
    menu: Option<ActorAddress>,
    locator: Locator,
    time: Option<TimeRound>,
}

impl OrderAgent {
    pub fn new(
        kitchen: Kitchen,
        id: OrderId,
        visitor: String,
        visitor_address: ActorAddress,
        dishes: Vec<OrderedDish>,
    ) -> Self {
        Self {
            kitchen,
            id,
            visitor,
            visitor_address,
            dishes,
            outcomes: HashMap::new(),
            reported: Vec::new(),
            cancelled: false,
            finished: false,
            menu: None,
            locator: Locator::new(),
            time: None,
        }
    }

    fn unresolved(&self) -> usize {
        self.dishes
            .iter()
            .filter(|dish| !self.outcomes.contains_key(&dish.id))
            .count()
    }

    async fn own_dishes(
        &self,
        ctx: &AgentContext<KitchenPayload, OrderTimer>,
    ) -> Result<Vec<ActorAddress>, KitchenError> {
        let filter = ServiceDescription::new(capability::DISH).with(capability::ATTR_ORDER, self.id.0);
        Ok(ctx.lookup(filter).await?)
    }

    /// Sends a cancel to every dish still registered; retries while some are missing.
    async fn cancel_dishes(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, OrderTimer>,
    ) -> Result<(), KitchenError> {
        if self.finished {
            return Ok(());
        }
        let dishes = self.own_dishes(ctx).await?;
        let reached = ctx.send(
            message(Performative::Cancel, conversation::ORDER_COOKING, KitchenPayload::Cancel)
                .to_all(dishes),
        );
        debug!(order = %self.id, reached, unresolved = self.unresolved(), "Cancel sent to dishes");
        if reached < self.unresolved() {
            ctx.schedule(ctx.fabric().settings().retry_delay, OrderTimer::CancelRetry);
        }
        Ok(())
    }

    fn record(
        &mut self,
        sender: Option<&ActorAddress>,
        dish: OrderedDish,
        outcome: Outcome,
        ctx: &mut AgentContext<KitchenPayload, OrderTimer>,
    ) {
        if let Some(sender) = sender {
            if !self.reported.contains(sender) {
                self.reported.push(sender.clone());
            }
        }
        self.outcomes.insert(dish.id, outcome);
        if self.unresolved() == 0 && !self.finished {
            self.finish(ctx);
        }
    }

    fn finish(&mut self, ctx: &mut AgentContext<KitchenPayload, OrderTimer>) {
        self.finished = true;
        ctx.cancel_timer(&OrderTimer::CancelRetry);

        let served: Vec<OrderedDish> = self
            .dishes
            .iter()
            .filter(|dish| self.outcomes.get(&dish.id).is_some_and(Outcome::is_served))
            .copied()
            .collect();
        let data = &self.kitchen.data;
        let mut lines = vec![format!("Order: {}", self.id.0), format!("Visitor: {}", self.visitor)];
        for dish in &self.dishes {
            let outcome = match self.outcomes.get(&dish.id) {
                Some(Outcome::Served) => "served".to_string(),
                Some(Outcome::Cancelled) => "cancelled".to_string(),
                Some(Outcome::Failed(reason)) => format!("failed: {reason}"),
                None => "unknown".to_string(),
            };
            lines.push(format!("  - {} ({outcome})", data.dish_name(dish.menu_dish)));
        }
        let (tone, title) = match (self.cancelled, served.len() == self.dishes.len()) {
            (true, _) => (Tone::Warning, "ORDER CANCELLED"),
            (false, true) => (Tone::Success, "ORDER READY"),
            (false, false) => (Tone::Failure, "ORDER INCOMPLETE"),
        };
        self.kitchen.console.report(tone, title, &lines);
        info!(order = %self.id, served = served.len(), cancelled = self.cancelled, "Order finished");

        if let Some(round) = self.time.take() {
            ctx.send(round.request.reply(Performative::Inform, KitchenPayload::Seconds(0.0)));
        }
        ctx.send(
            message(
                Performative::Inform,
                conversation::ORDER_COOKING,
                KitchenPayload::OrderFinished {
                    served,
                    cancelled: self.cancelled,
                },
            )
            .to(self.visitor_address.clone()),
        );
    }

    fn dismiss_dishes(&self, ctx: &mut AgentContext<KitchenPayload, OrderTimer>) {
        debug!(order = %self.id, dishes = self.reported.len(), "Dismissed");
        ctx.send(
            message(Performative::Request, conversation::DISMISS, KitchenPayload::Dismiss)
                .to_all(self.reported.clone()),
        );
    }

    async fn start_time_round(
        &mut self,
        request: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, OrderTimer>,
    ) -> Result<(), KitchenError> {
        if self.finished {
            ctx.send(request.reply(Performative::Inform, KitchenPayload::Seconds(0.0)));
            return Ok(());
        }
        let dishes = self.own_dishes(ctx).await?;
        let correlation = ctx.new_correlation();
        let expected = ctx.send(
            message(Performative::Request, conversation::ORDER_TIME, KitchenPayload::TimeQuery)
                .to_all(dishes)
                .with_correlation(correlation.clone()),
        );
        self.time = Some(TimeRound {
            request: request.clone(),
            correlation,
            expected,
            answered: HashSet::new(),
            seconds: 0.0,
            idle: Vec::new(),
            asked_menu: false,
        });
        if expected == 0 {
            self.close_dish_round(ctx).await?;
        } else {
            ctx.schedule(self.kitchen.config.staleness_window(), OrderTimer::TimeRoundTimeout);
        }
        Ok(())
    }

    fn dish_answered(
        &mut self,
        sender: Option<&ActorAddress>,
        seconds: f64,
        idle: Option<CardId>,
    ) -> bool {
        let (Some(round), Some(sender)) = (self.time.as_mut(), sender) else {
            return false;
        };
        if round.asked_menu || !round.answered.insert(sender.clone()) {
            return false;
        }
        round.seconds += seconds;
        round.idle.extend(idle);
        round.answered.len() >= round.expected
    }

    /// Every dish answered (or the wait ran out): ask the menu about the idle ones.
    async fn close_dish_round(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, OrderTimer>,
    ) -> Result<(), KitchenError> {
        ctx.cancel_timer(&OrderTimer::TimeRoundTimeout);
        ctx.cancel_timer(&OrderTimer::Relocate);
        let Some(round) = self.time.as_ref() else {
            return Ok(());
        };
        if round.idle.is_empty() {
            if let Some(round) = self.time.take() {
                ctx.send(round.request.reply(Performative::Inform, KitchenPayload::Seconds(round.seconds)));
            }
            return Ok(());
        }
        if self.menu.is_none() {
            let filter = ServiceDescription::new(capability::MENU);
            self.menu = self.locator.one(ctx, filter, OrderTimer::Relocate).await?;
        }
        let (Some(menu), Some(round)) = (self.menu.clone(), self.time.as_mut()) else {
            return Ok(());
        };
        round.asked_menu = true;
        ctx.send(
            message(
                Performative::Request,
                conversation::TIME_CALCULATION,
                KitchenPayload::EstimateDishes {
                    cards: round.idle.clone(),
                },
            )
            .to(menu)
            .with_correlation(round.correlation.clone()),
        );
        Ok(())
    }
}

#[async_trait]
impl Agent for OrderAgent {
    type Payload = KitchenPayload;
    type Timer = OrderTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        self.id.to_string()
    }

    fn services(&self) -> Vec<ServiceDescription> {
        vec![ServiceDescription::new(capability::ORDER).with(capability::ATTR_ID, self.id.0)]
    }

    fn pattern(&self) -> Pattern {
        let base = Pattern::any_of([
            Pattern::conversation(conversation::ORDER_COOKING),
            Pattern::conversation(conversation::DISMISS),
        ]);
        let time = match &self.time {
            None => Pattern::performative(Performative::Request)
                .and(Pattern::conversation(conversation::ORDER_TIME)),
            Some(round) => Pattern::correlation(round.correlation.clone()),
        };
        base.or(time)
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, OrderTimer>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::DishFinished { dish, outcome } => {
                self.record(message.sender(), *dish, outcome.clone(), ctx);
            }
            KitchenPayload::Cancel => {
                if !self.finished && !self.cancelled {
                    info!(order = %self.id, visitor = %self.visitor, "Order cancellation requested");
                    self.cancelled = true;
                    self.cancel_dishes(ctx).await?;
                }
            }
            KitchenPayload::TimeQuery => self.start_time_round(message, ctx).await?,
            KitchenPayload::Seconds(seconds) => {
                let from_menu = message.conversation() == conversation::TIME_CALCULATION;
                if from_menu {
                    if let Some(round) = self.time.take() {
                        let total = round.seconds + seconds;
                        ctx.send(round.request.reply(Performative::Inform, KitchenPayload::Seconds(total)));
                    }
                } else if self.dish_answered(message.sender(), *seconds, None) {
                    self.close_dish_round(ctx).await?;
                }
            }
            KitchenPayload::DishStatus(DishStatusReport::Waiting { card, .. }) => {
                if self.dish_answered(message.sender(), 0.0, Some(*card)) {
                    self.close_dish_round(ctx).await?;
                }
            }
            KitchenPayload::Dismiss => {
                self.dismiss_dishes(ctx);
                return Ok(Flow::Stop);
            }
            _ => debug!(kind = message.kind(), "Ignored"),
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        timer: OrderTimer,
        ctx: &mut AgentContext<KitchenPayload, OrderTimer>,
    ) -> Result<Flow, KitchenError> {
        match timer {
            OrderTimer::CancelRetry => self.cancel_dishes(ctx).await?,
            OrderTimer::TimeRoundTimeout | OrderTimer::Relocate => {
                let waiting_on_dishes = self.time.as_ref().is_some_and(|round| !round.asked_menu);
                if waiting_on_dishes {
                    self.close_dish_round(ctx).await?;
                }
            }
        }
        Ok(Flow::Continue)
    }
}
