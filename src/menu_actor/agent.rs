use super::actualize::{actualize, Actualization, Rules};
use crate::error::KitchenError;
use crate::kitchen::{Kitchen, Locator};
use crate::model::{CardId, EquipmentClass, Operation, ProductClass};
use crate::protocol::{capability, conversation, message, KitchenMessage, KitchenPayload};
use crate::time_model::KitchenSnapshot;
use agent_fabric::{
    ActorAddress, Agent, AgentContext, Flow, Pattern, Performative, ServiceDescription,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTimer {
    /// The snapshot is no longer trusted.
    Stale,
    /// Give up waiting for remaining-time replies.
    RefreshTimeout,
    /// Look the warehouse up again.
    Relocate,
}

#[derive(Debug)]
enum Phase {
    /// Requests wait in the mailbox until the warehouse is known.
    Opening,
    Ready,
    /// Waiting for every cook and unit to say how long it is busy.
    Refreshing {
        correlation: String,
        expected: usize,
        replies: Vec<(Option<EquipmentClass>, f64)>,
    },
    /// Waiting for the warehouse's stock levels.
    Stocktaking { correlation: String },
}

/// Keeps the kitchen snapshot, answers time estimates and decides the active menu.
///
/// One refresh and one menu check at a time: while a refresh is in flight, estimate
/// requests stay in the mailbox, and menu requests join the check already running.
pub struct MenuAgent {
    kitchen: Kitchen,
    cooks: Vec<ActorAddress>,
    equipment: Vec<ActorAddress>,
    warehouse: Option<ActorAddress>,
    locator: Locator,
    snapshot: KitchenSnapshot,
    fresh: bool,
    phase: Phase,
    /// Requests taken from the mailbox that wait for the current phase to end.
    deferred: Vec<KitchenMessage>,
    last_menu: Option<Actualization>,
}

impl MenuAgent {
    pub fn new(kitchen: Kitchen) -> Self {
        Self {
            kitchen,
            cooks: Vec::new(),
            equipment: Vec::new(),
            warehouse: None,
            locator: Locator::new(),
            snapshot: KitchenSnapshot::default(),
            fresh: false,
            phase: Phase::Opening,
            deferred: Vec::new(),
            last_menu: None,
        }
    }

    fn serve(
        &mut self,
        request: KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<(), KitchenError> {
        if !self.fresh {
            self.deferred.push(request);
            self.start_refresh(ctx)
        } else if matches!(request.payload(), KitchenPayload::ActualizeMenu) {
            self.deferred.push(request);
            self.start_stocktaking(ctx)
        } else {
            self.answer_estimate(&request, ctx)
        }
    }

    fn start_refresh(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<(), KitchenError> {
        let correlation = ctx.new_correlation();
        let mut expected = 0;
        if !self.cooks.is_empty() {
            expected += ctx.send(
                message(
                    Performative::Request,
                    conversation::COOK_RESERVING,
                    KitchenPayload::RemainingTimeQuery,
                )
                .to_all(self.cooks.iter().cloned())
                .with_correlation(correlation.clone()),
            );
        }
        if !self.equipment.is_empty() {
            expected += ctx.send(
                message(
                    Performative::Request,
                    conversation::EQUIPMENT_RESERVING,
                    KitchenPayload::RemainingTimeQuery,
                )
                .to_all(self.equipment.iter().cloned())
                .with_correlation(correlation.clone()),
            );
        }
        debug!(expected, "Refreshing kitchen snapshot");

        self.phase = Phase::Refreshing {
            correlation,
            expected,
            replies: Vec::with_capacity(expected),
        };
        if expected == 0 {
            return self.finish_refresh(ctx);
        }
        ctx.schedule(self.kitchen.config.staleness_window(), MenuTimer::RefreshTimeout);
        Ok(())
    }

    fn finish_refresh(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<(), KitchenError> {
        let Phase::Refreshing { replies, .. } = std::mem::replace(&mut self.phase, Phase::Ready)
        else {
            return Ok(());
        };
        ctx.cancel_timer(&MenuTimer::RefreshTimeout);

        self.snapshot = KitchenSnapshot::from_remaining_times(replies);
        self.fresh = true;
        ctx.schedule(self.kitchen.config.staleness_window(), MenuTimer::Stale);
        debug!(cooks = ?self.snapshot.cooks(), "Kitchen snapshot fresh");

        let mut actualize_pending = false;
        for request in std::mem::take(&mut self.deferred) {
            if matches!(request.payload(), KitchenPayload::ActualizeMenu) {
                self.deferred.push(request);
                actualize_pending = true;
            } else {
                self.answer_estimate(&request, ctx)?;
            }
        }
        if actualize_pending {
            self.start_stocktaking(ctx)?;
        }
        Ok(())
    }

    fn start_stocktaking(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<(), KitchenError> {
        let warehouse = self.warehouse.clone().ok_or_else(|| KitchenError::NotRegistered {
            capability: capability::WAREHOUSE.to_string(),
            attempts: 0,
        })?;
        let correlation = ctx.new_correlation();
        info!("Actualizing menu...");
        ctx.send(
            message(
                Performative::Request,
                conversation::WAREHOUSE,
                KitchenPayload::StockQuery,
            )
            .to(warehouse)
            .with_correlation(correlation.clone()),
        );
        self.phase = Phase::Stocktaking { correlation };
        Ok(())
    }

    fn finish_check(
        &mut self,
        stock: &BTreeMap<ProductClass, f64>,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) {
        let config = &self.kitchen.config;
        let rules = Rules {
            check_operation_kinds: config.check_operation_type_availability,
            factor: config.factor(),
            threshold: config.dish_cooking_time_threshold(),
        };
        let menu = actualize(&self.kitchen.data, &self.snapshot, stock, &rules);

        if self.last_menu.as_ref() != Some(&menu) {
            for (dish, reason) in &menu.excluded {
                info!(dish = %self.kitchen.data.dish_name(*dish), %reason, "Excluded from menu");
            }
            info!(active = menu.active.len(), excluded = menu.excluded.len(), "Menu actualized");
        }

        for request in std::mem::take(&mut self.deferred) {
            ctx.send(request.reply(
                Performative::Inform,
                KitchenPayload::ActiveMenu {
                    dishes: menu.active.clone(),
                    excluded: menu.excluded.clone(),
                },
            ));
        }
        self.last_menu = Some(menu);
        self.phase = Phase::Ready;
    }

    async fn open(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<(), KitchenError> {
        let filter = ServiceDescription::new(capability::WAREHOUSE);
        self.warehouse = self.locator.one(ctx, filter, MenuTimer::Relocate).await?;
        if self.warehouse.is_some() {
            info!(cooks = self.cooks.len(), equipment = self.equipment.len(), "Menu ready");
            self.phase = Phase::Ready;
        }
        Ok(())
    }

    fn answer_estimate(
        &self,
        request: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<(), KitchenError> {
        let factor = self.kitchen.config.factor();
        let answer = match request.payload() {
            KitchenPayload::EstimateOperations { card, skip } => {
                let operations = self.operations(*card)?;
                let rest = operations.get(*skip..).unwrap_or(&[]);
                KitchenPayload::Seconds(self.snapshot.completion_time(rest, factor))
            }
            KitchenPayload::EstimateDishes { cards } => {
                let chains = cards
                    .iter()
                    .map(|card| self.operations(*card))
                    .collect::<Result<Vec<_>, _>>()?;
                KitchenPayload::Seconds(self.snapshot.dishes_completion_time(chains, factor))
            }
            KitchenPayload::EstimateWaiting { dishes } => {
                let waits = dishes
                    .iter()
                    .map(|(card, priority)| {
                        self.operations(*card)
                            .map(|ops| self.snapshot.effective_wait(ops, *priority, factor))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                KitchenPayload::WaitingTimes(waits)
            }
            _ => return Ok(()),
        };
        ctx.send(request.reply(Performative::Inform, answer));
        Ok(())
    }

    fn operations(&self, card: CardId) -> Result<&[Operation], KitchenError> {
        self.kitchen
            .data
            .card(card)
            .map(|card| card.operations.as_slice())
            .ok_or(KitchenError::UnknownCard(card))
    }
}

#[async_trait]
impl Agent for MenuAgent {
    type Payload = KitchenPayload;
    type Timer = MenuTimer;
    type Error = KitchenError;

    fn name(&self) -> String {
        "menu".into()
    }

    fn services(&self) -> Vec<ServiceDescription> {
        vec![ServiceDescription::new(capability::MENU)]
    }

    async fn on_start(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<Flow, KitchenError> {
        self.cooks = ctx.lookup(ServiceDescription::new(capability::COOK)).await?;
        self.equipment = ctx
            .lookup(ServiceDescription::new(capability::EQUIPMENT))
            .await?;
        if self.cooks.is_empty() {
            warn!("No cooks in the kitchen; every dish will be too slow");
        }
        self.open(ctx).await?;
        Ok(Flow::Continue)
    }

    fn pattern(&self) -> Pattern {
        let actualize = Pattern::performative(Performative::Request)
            .and(Pattern::kind("actualize-menu"));
        match &self.phase {
            Phase::Opening => Pattern::nothing(),
            Phase::Ready => Pattern::performative(Performative::Request).and(
                Pattern::conversation(conversation::MENU_ACTUALIZATION)
                    .or(Pattern::conversation(conversation::TIME_CALCULATION)),
            ),
            Phase::Refreshing { correlation, .. } => Pattern::correlation(correlation.clone())
                .and(Pattern::kind("remaining-time"))
                .or(actualize),
            Phase::Stocktaking { correlation } => Pattern::correlation(correlation.clone())
                .and(Pattern::kind("stock-levels"))
                .or(actualize),
        }
    }

    async fn on_message(
        &mut self,
        message: &KitchenMessage,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<Flow, KitchenError> {
        match message.payload() {
            KitchenPayload::RemainingTime {
                seconds,
                equipment_class,
            } => {
                let done = match &mut self.phase {
                    Phase::Refreshing {
                        expected, replies, ..
                    } => {
                        replies.push((*equipment_class, *seconds));
                        replies.len() >= *expected
                    }
                    _ => false,
                };
                if done {
                    self.finish_refresh(ctx)?;
                }
            }
            KitchenPayload::StockLevels(stock) => self.finish_check(stock, ctx),
            _ if matches!(self.phase, Phase::Ready) => self.serve(message.clone(), ctx)?,
            _ => self.deferred.push(message.clone()),
        }
        Ok(Flow::Continue)
    }

    async fn on_timer(
        &mut self,
        timer: MenuTimer,
        ctx: &mut AgentContext<KitchenPayload, MenuTimer>,
    ) -> Result<Flow, KitchenError> {
        match timer {
            MenuTimer::Stale => self.fresh = false,
            MenuTimer::RefreshTimeout => {
                if let Phase::Refreshing {
                    expected, replies, ..
                } = &self.phase
                {
                    warn!(expected, received = replies.len(), "Snapshot refresh timed out");
                }
                self.finish_refresh(ctx)?;
            }
            MenuTimer::Relocate => self.open(ctx).await?,
        }
        Ok(Flow::Continue)
    }
}
