use super::plan::plan_activations;
use crate::console::Tone;
use crate::dish_actor::DishAgent;
use crate::error::KitchenError;
use crate::kitchen::{Kitchen, Locator};
use crate::model::{timestamp, CardId, MenuDishId, OrderId, OrderedDish};
use crate::order_actor::OrderAgent;
use crate::protocol::{
    capability, conversation, message, DishStatusReport, KitchenMessage, KitchenPayload,
};
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorTimer {
    /// Start the next scheduling cycle.
    Tick,
    /// Stop waiting for dish status replies.
    PollTimeout,
    /// Look the menu up again.
    Relocate,
}

#[derive(Debug)]
enum Intake {
    Idle,
    /// The visitor's request, waiting for the active menu.
    AwaitingMenu {
        request: KitchenMessage,
        correlation: String,
    },
}

#[derive(Debug)]
struct Waiting {
    dish: ActorAddress,
    card: CardId,
    priority: u32,
}

#[derive(Debug)]
enum Cycle {
    Idle,
    Polling {
        correlation: String,
        expected: usize,
        answered: HashSet<ActorAddress>,
        cooking: usize,
        waiting: Vec<Waiting>,
    },
    Ranking {
        correlation: String,
        cooking: usize,
        waiting: Vec<Waiting>,
    },
}

/// Takes orders and decides which waiting dish starts cooking.
pub struct SupervisorAgent {
    kitchen: Kitchen,
    menu: Option<ActorAddress>,
    locator: Locator,
    cooks: usize,
    orders: u32,
    intake: Intake,
    cycle: Cycle,
}

impl SupervisorAgent {
    pub fn new(kitchen: Kitchen) -> Self {
        Self {
            kitchen,
            menu: None,
            locator: Locator::new(),
            cooks: 0,
            orders: 0,
            intake: Intake::Idle,
            cycle: Cycle::Idle,
        }
    }

    fn menu(&self) -> Result<ActorAddress, KitchenError> {
        self.menu.clone().ok_or_else(|| KitchenError::NotRegistered {
            capability: capability::MENU.to_string(),
            attempts: 0,
        })
    }

    // --- order intake ---

    fn request_menu(
        &mut self,
        request: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<(), KitchenError> {
        let correlation = ctx.new_correlation();
        ctx.send(
            message(
                Performative::Request,
                conversation::MENU_ACTUALIZATION,
                KitchenPayload::ActualizeMenu,
            )
            .to(self.menu()?)
            .with_correlation(correlation.clone()),
        );
        self.intake = Intake::AwaitingMenu {
            request: request.clone(),
            correlation,
        };
        Ok(())
    }

    fn create_order(
        &mut self,
        active: &[MenuDishId],
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<(), KitchenError> {
        let Intake::AwaitingMenu { request, .. } = std::mem::replace(&mut self.intake, Intake::Idle)
        else {
            return Ok(());
        };
        let KitchenPayload::PlaceOrder { visitor, dishes } = request.payload() else {
            return Ok(());
        };
        let data = &self.kitchen.data;
        let order_id = OrderId(self.orders + 1);

        let (accepted, dropped): (Vec<OrderedDish>, Vec<OrderedDish>) = dishes
            .iter()
            .partition(|dish| active.contains(&dish.menu_dish));
        for dish in &dropped {
            info!(%order_id, dish = %data.dish_name(dish.menu_dish), "Dish not on the menu, dropped");
        }

        if accepted.is_empty() {
            info!(%order_id, %visitor, "Nothing left to cook, order rejected");
            self.kitchen.console.report(
                Tone::Warning,
                "ORDER REJECTED",
                &[format!("Visitor: {visitor}"), "No ordered dish is available".into()],
            );
            ctx.send(request.reply(Performative::Disconfirm, KitchenPayload::OrderRejected));
            return Ok(());
        }

        let visitor_address = request.sender().cloned().ok_or_else(|| {
            KitchenError::ActorCommunicationError("order request without a sender".into())
        })?;
        let order = ctx.spawn(OrderAgent::new(
            self.kitchen.clone(),
            order_id,
            visitor.clone(),
            visitor_address,
            accepted.clone(),
        ));
        for dish in &accepted {
            let card = data
                .card_for(dish.menu_dish)
                .ok_or(KitchenError::UnknownMenuDish(dish.menu_dish))?;
            ctx.spawn(DishAgent::new(self.kitchen.clone(), order_id, *dish, card.id));
        }

        let total: f64 = accepted.iter().map(|dish| data.price(dish.menu_dish)).sum();
        info!(%order_id, %visitor, dishes = accepted.len(), total, "Order created");
        let mut lines = vec![
            format!("Order: {}", order_id.0),
            format!("Created: {}", timestamp::now().format(timestamp::FORMAT)),
            format!("Visitor: {visitor}"),
            format!("Cost: {total:.2}"),
            "Dishes:".to_string(),
        ];
        lines.extend(accepted.iter().map(|dish| format!("  - {}", data.dish_name(dish.menu_dish))));
        self.kitchen.console.report(Tone::Success, "NEW ORDER", &lines);

        ctx.send(request.reply(
            Performative::Confirm,
            KitchenPayload::OrderAccepted {
                order: order_id,
                address: order,
                dishes: accepted,
                total,
            },
        ));
        self.orders += 1;
        Ok(())
    }

    // --- scheduling cycle ---

    async fn poll_dishes(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<(), KitchenError> {
        let dishes = ctx.lookup(ServiceDescription::new(capability::DISH)).await?;
        if dishes.is_empty() {
            self.next_cycle(ctx);
            return Ok(());
        }

        let correlation = ctx.new_correlation();
        let expected = ctx.send(
            message(
                Performative::Request,
                conversation::KITCHEN_MANAGEMENT,
                KitchenPayload::DishStatusQuery,
            )
            .to_all(dishes)
            .with_correlation(correlation.clone()),
        );
        if expected == 0 {
            self.next_cycle(ctx);
            return Ok(());
        }
        ctx.schedule(self.kitchen.config.staleness_window(), SupervisorTimer::PollTimeout);
        self.cycle = Cycle::Polling {
            correlation,
            expected,
            answered: HashSet::new(),
            cooking: 0,
            waiting: Vec::new(),
        };
        Ok(())
    }

    fn record_status(
        &mut self,
        reply: &KitchenMessage,
        status: &DishStatusReport,
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<(), KitchenError> {
        let Cycle::Polling {
            expected,
            answered,
            cooking,
            waiting,
            ..
        } = &mut self.cycle
        else {
            return Ok(());
        };
        let Some(dish) = reply.sender() else {
            return Ok(());
        };
        if !answered.insert(dish.clone()) {
            return Ok(());
        }
        match status {
            DishStatusReport::Cooking => *cooking += 1,
            DishStatusReport::Done => {}
            DishStatusReport::Waiting { card, priority } => waiting.push(Waiting {
                dish: dish.clone(),
                card: *card,
                priority: *priority,
            }),
        }
        if answered.len() >= *expected {
            self.rank(ctx)?;
        }
        Ok(())
    }

    fn rank(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<(), KitchenError> {
        ctx.cancel_timer(&SupervisorTimer::PollTimeout);
        let Cycle::Polling {
            cooking, waiting, ..
        } = std::mem::replace(&mut self.cycle, Cycle::Idle)
        else {
            return Ok(());
        };
        if waiting.is_empty() {
            self.next_cycle(ctx);
            return Ok(());
        }

        let correlation = ctx.new_correlation();
        ctx.send(
            message(
                Performative::Request,
                conversation::TIME_CALCULATION,
                KitchenPayload::EstimateWaiting {
                    dishes: waiting.iter().map(|w| (w.card, w.priority)).collect(),
                },
            )
            .to(self.menu()?)
            .with_correlation(correlation.clone()),
        );
        self.cycle = Cycle::Ranking {
            correlation,
            cooking,
            waiting,
        };
        Ok(())
    }

    fn activate(
        &mut self,
        waits: &[f64],
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) {
        let Cycle::Ranking {
            cooking, waiting, ..
        } = std::mem::replace(&mut self.cycle, Cycle::Idle)
        else {
            return;
        };
        if waits.len() != waiting.len() {
            warn!(expected = waiting.len(), got = waits.len(), "Wait estimates do not match");
        }
        let ranked = waiting
            .into_iter()
            .zip(waits.iter().copied())
            .map(|(w, wait)| (w.dish, wait))
            .collect();
        let plan = plan_activations(ranked, self.cooks, cooking);

        if !plan.start.is_empty() {
            info!(start = plan.start.len(), waiting = plan.passed_over.len(), cooking, "Starting dishes");
            ctx.send(
                message(
                    Performative::Request,
                    conversation::KITCHEN_MANAGEMENT,
                    KitchenPayload::StartCooking,
                )
                .to_all(plan.start),
            );
        }
        if !plan.passed_over.is_empty() {
            debug!(dishes = plan.passed_over.len(), by = plan.increment, "Raising priority");
            ctx.send(
                message(
                    Performative::Inform,
                    conversation::KITCHEN_MANAGEMENT,
                    KitchenPayload::IncreasePriority(plan.increment),
                )
                .to_all(plan.passed_over),
            );
        }
        self.next_cycle(ctx);
    }

    /// Finds the menu, counts the cooks and starts the scheduling cycle.
    async fn open(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<(), KitchenError> {
        let filter = ServiceDescription::new(capability::MENU);
        self.menu = self.locator.one(ctx, filter, SupervisorTimer::Relocate).await?;
        if self.menu.is_none() {
            return Ok(());
        }
        self.cooks = ctx.lookup(ServiceDescription::new(capability::COOK)).await?.len();
        info!(cooks = self.cooks, "Supervisor ready");
        self.next_cycle(ctx);
        Ok(())
    }

    fn next_cycle(&mut self, ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>) {
        self.cycle = Cycle::Idle;
        ctx.schedule(self.kitchen.config.staleness_window(), SupervisorTimer::Tick);
    }
}

#[async_trait]
impl Agent for SupervisorAgent {
    type Payload = KitchenPayload;
    type Timer = SupervisorTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        "supervisor".into()
    }

    fn services(&self) -> Vec<ServiceDescription> {
        vec![ServiceDescription::new(capability::SUPERVISOR)]
    }

    async fn on_start(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<Flow, KitchenError> {
        self.open(ctx).await?;
        Ok(Flow::Continue)
    }

    fn pattern(&self) -> Pattern {
        if self.menu.is_none() {
            // orders wait in the mailbox until the menu is known
            return Pattern::nothing();
        }
        let intake = match &self.intake {
            Intake::Idle => Pattern::performative(Performative::Request)
                .and(Pattern::conversation(conversation::ORDER_CREATION)),
            Intake::AwaitingMenu { correlation, .. } => {
                Pattern::correlation(correlation.clone()).and(Pattern::kind("active-menu"))
            }
        };
        let cycle = match &self.cycle {
            Cycle::Idle => Pattern::nothing(),
            Cycle::Polling { correlation, .. } => {
                Pattern::correlation(correlation.clone()).and(Pattern::kind("dish-status"))
            }
            Cycle::Ranking { correlation, .. } => {
                Pattern::correlation(correlation.clone()).and(Pattern::kind("waiting-times"))
            }
        };
        intake.or(cycle)
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::PlaceOrder { visitor, .. } => {
                debug!(%visitor, "Order request received");
                self.request_menu(message, ctx)?;
            }
            KitchenPayload::ActiveMenu { dishes, .. } => self.create_order(dishes, ctx)?,
            KitchenPayload::DishStatus(status) => self.record_status(message, status, ctx)?,
            KitchenPayload::WaitingTimes(waits) => self.activate(waits, ctx),
            _ => debug!(kind = message.kind(), "Ignored"),
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        timer: SupervisorTimer,
        ctx: &mut AgentContext<KitchenPayload, SupervisorTimer>,
    ) -> Result<Flow, KitchenError> {
        match timer {
            SupervisorTimer::Tick => self.poll_dishes(ctx).await?,
            SupervisorTimer::PollTimeout => {
                debug!("Some dishes did not answer the status query");
                self.rank(ctx)?;
            }
            SupervisorTimer::Relocate => self.open(ctx).await?,
        }
        Ok(Flow::Continue)
    }
}
