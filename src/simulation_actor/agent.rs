use crate::error::KitchenError;
use crate::kitchen::{Kitchen, Locator};
use crate::menu_actor::MenuAgent;
use crate::model::VisitorOrder;
use crate::protocol::{capability, conversation, message, KitchenMessage, KitchenPayload};
use crate::resource_actor;
use crate::supervisor_actor::SupervisorAgent;
use crate::visitor_actor::VisitorAgent;
use crate::warehouse_actor::WarehouseAgent;
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationTimer {
    NextVisitor,
    /// Check the directory again for the agents being brought up.
    Registration,
}

/// Which group of agents the kitchen is waiting for before the next one can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opening {
    /// Cooks, equipment and the warehouse.
    Resources,
    Menu,
    Supervisor,
    Open,
}

/// Brings the kitchen up, lets the visitors in one by one and reports when the last one
/// has left.
pub struct SimulationAgent {
    kitchen: Kitchen,
    driver: ActorAddress,
    arrivals: VecDeque<VisitorOrder>,
    visitors: usize,
    left: usize,
    opening: Opening,
    cooks: usize,
    units: usize,
    locator: Locator,
}

impl SimulationAgent {
    /// `driver` receives `SimulationFinished` once every visitor is gone.
    pub fn new(kitchen: Kitchen, driver: ActorAddress) -> Self {
        let arrivals: VecDeque<VisitorOrder> = kitchen.data.visitor_orders.iter().cloned().collect();
        Self {
            visitors: arrivals.len(),
            kitchen,
            driver,
            arrivals,
            left: 0,
            opening: Opening::Resources,
            cooks: 0,
            units: 0,
            locator: Locator::new(),
        }
    }

    /// Whether every agent of the current group is registered. Schedules another check
    /// when not.
    async fn group_registered(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, SimulationTimer>,
    ) -> Result<bool, KitchenError> {
        let expected = match self.opening {
            Opening::Resources => vec![
                (capability::COOK, self.cooks),
                (capability::EQUIPMENT, self.units),
                (capability::WAREHOUSE, 1),
            ],
            Opening::Menu => vec![(capability::MENU, 1)],
            Opening::Supervisor => vec![(capability::SUPERVISOR, 1)],
            Opening::Open => Vec::new(),
        };
        for (capability, count) in expected {
            if count == 0 {
                continue;
            }
            let filter = ServiceDescription::new(capability);
            let found = self
                .locator
                .all(ctx, filter, count, SimulationTimer::Registration)
                .await?;
            if found.is_none() {
                return Ok(false);
            }
            debug!(capability, count, "Registered");
        }
        Ok(true)
    }

    /// Starts each group once the one it depends on is registered, then lets the first
    /// visitor in.
    async fn open(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, SimulationTimer>,
    ) -> Result<Flow, KitchenError> {
        while self.opening != Opening::Open {
            if !self.group_registered(ctx).await? {
                return Ok(Flow::Continue);
            }
            self.opening = match self.opening {
                Opening::Resources => {
                    ctx.spawn(MenuAgent::new(self.kitchen.clone()));
                    Opening::Menu
                }
                Opening::Menu => {
                    ctx.spawn(SupervisorAgent::new(self.kitchen.clone()));
                    Opening::Supervisor
                }
                Opening::Supervisor | Opening::Open => Opening::Open,
            };
        }

        if self.arrivals.is_empty() {
            return Ok(self.finish(ctx));
        }
        let delay = self.kitchen.config.new_visitor_delay(&mut rand::rng());
        ctx.schedule(delay, SimulationTimer::NextVisitor);
        Ok(Flow::Continue)
    }

    fn finish(&self, ctx: &mut AgentContext<KitchenPayload, SimulationTimer>) -> Flow {
        info!(visitors = self.visitors, "Every visitor has left");
        ctx.send(
            message(
                Performative::Inform,
                conversation::SIMULATION,
                KitchenPayload::SimulationFinished {
                    visitors: self.visitors,
                },
            )
            .to(self.driver.clone()),
        );
        Flow::Stop
    }

    fn dismiss(&self, order: &ActorAddress, ctx: &mut AgentContext<KitchenPayload, SimulationTimer>) {
        ctx.send(
            message(Performative::Request, conversation::DISMISS, KitchenPayload::Dismiss)
                .to(order.clone()),
        );
    }
}

#[async_trait]
impl Agent for SimulationAgent {
    type Payload = KitchenPayload;
    type Timer = SimulationTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        "simulation".into()
    }

    fn services(&self) -> Vec<ServiceDescription> {
        vec![ServiceDescription::new(capability::SIMULATION)]
    }

    async fn on_start(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, SimulationTimer>,
    ) -> Result<Flow, KitchenError> {
        let data = self.kitchen.data.clone();
        let factor = self.kitchen.config.factor();

        let cooks: Vec<_> = data.cooks.iter().filter(|cook| cook.active).collect();
        let units: Vec<_> = data.equipment.iter().filter(|unit| unit.active).collect();
        for cook in &cooks {
            ctx.spawn(resource_actor::cook(cook, factor));
        }
        for unit in &units {
            ctx.spawn(resource_actor::equipment(unit, factor));
        }
        ctx.spawn(WarehouseAgent::new(&data.products));
        info!(cooks = cooks.len(), equipment = units.len(), lots = data.products.len(), "Kitchen opened");
        self.cooks = cooks.len();
        self.units = units.len();
        self.open(ctx).await
    }

    fn pattern(&self) -> Pattern {
        Pattern::conversation(conversation::SIMULATION).and(Pattern::kind("visitor-left"))
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, SimulationTimer>,
    ) -> Result<Flow, KitchenError> {
        if let KitchenPayload::VisitorLeft { visitor, order } = message.payload() {
            if let Some(order) = order {
                self.dismiss(order, ctx);
            }
            self.left += 1;
            debug!(%visitor, left = self.left, of = self.visitors, "Visitor gone");
            if self.left >= self.visitors {
                return Ok(self.finish(ctx));
            }
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        timer: SimulationTimer,
        ctx: &mut AgentContext<KitchenPayload, SimulationTimer>,
    ) -> Result<Flow, KitchenError> {
        if timer == SimulationTimer::Registration {
            return self.open(ctx).await;
        }
        if let Some(schedule) = self.arrivals.pop_front() {
            debug!(visitor = %schedule.visitor_name, "Visitor arrives");
            ctx.spawn(VisitorAgent::new(self.kitchen.clone(), schedule, ctx.address().clone()));
        }
        if !self.arrivals.is_empty() {
            let delay = self.kitchen.config.new_visitor_delay(&mut rand::rng());
            ctx.schedule(delay, SimulationTimer::NextVisitor);
        }
        Ok(Flow::Continue)
    }
}
