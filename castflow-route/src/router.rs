use std::sync::Arc;
use std::time::Instant;

use castflow_benchmark::RoutingMetrics;
use castflow_grid::{Direction, FlowLink, FlowWorld, FluidAction, FluidId, FluidStack, Position};
use log::{debug, info};

use crate::config::RouteConfig;
use crate::discover::{discover, filter_sinks};
use crate::error::RouteError;
use crate::flow::FlowPlan;
use crate::graph::FlowGraph;
use crate::link;

/// Outcome of one activation.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub source: Position,
    pub root: Position,
    /// `None` if the crucible had nothing to pour.
    pub fluid: Option<FluidId>,
    /// Channels that received a flow link.
    pub conduits: usize,
    /// Mold tables now drawing from the crucible, sorted.
    pub sinks: Vec<Position>,
    /// Mold tables found but unable to take the fluid.
    pub filtered: Vec<Position>,
    /// Total path length over all routed mold tables.
    pub hops: usize,
}

impl Activation {
    fn empty(source: Position, root: Position) -> Self {
        Self {
            source,
            root,
            fluid: None,
            conduits: 0,
            sinks: Vec::new(),
            filtered: Vec::new(),
            hops: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

/// What one mold table did during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkTick {
    pub drawn: u32,
    pub finished: bool,
    pub cast: bool,
}

/// Totals over all mold tables for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub sinks: usize,
    pub drawn: u64,
    pub finished: usize,
    pub casts: usize,
}

/// Entry point of the routing engine.
///
/// Holds configuration and metrics only; all node state lives in the world
/// passed to each call, which must be borrowed mutably for anything that
/// writes. One activation therefore always runs to completion before the
/// next one starts.
pub struct Router {
    config: RouteConfig,
    metrics: Arc<RoutingMetrics>,
}

impl Router {
    pub fn new(config: RouteConfig) -> Self {
        let metrics = Arc::new(RoutingMetrics::new(config.to_string()));
        Self { config, metrics }
    }

    pub fn with_metrics(config: RouteConfig, metrics: Arc<RoutingMetrics>) -> Self {
        Self { config, metrics }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<RoutingMetrics> {
        self.metrics.clone()
    }

    /// Starts a flow from the crucible next to the channel at `conduit`.
    ///
    /// Sides are checked in [`Direction::HORIZONTAL`] order and the first
    /// crucible wins. Returns `None` if no crucible touches the channel from
    /// the side.
    pub fn activate<W: FlowWorld + ?Sized>(
        &self,
        world: &mut W,
        conduit: Position,
    ) -> Result<Option<Activation>, RouteError> {
        if !world.is_conduit(conduit) {
            return Err(RouteError::NotAConduit(conduit));
        }
        let source = Direction::HORIZONTAL
            .into_iter()
            .filter_map(|dir| conduit.checked_relative(dir, 1))
            .find(|&pos| world.source(pos).is_some());

        match source {
            Some(source) => self.route_from_source(world, source, conduit).map(Some),
            None => {
                debug!("No crucible next to {}", conduit);
                Ok(None)
            }
        }
    }

    /// Updates the redstone signal a channel receives.
    ///
    /// Activates the channel only when the signal rises; holding or dropping
    /// the signal just records it. Returns the activation if one ran.
    pub fn set_signal<W: FlowWorld + ?Sized>(
        &self,
        world: &mut W,
        pos: Position,
        powered: bool,
    ) -> Result<Option<Activation>, RouteError> {
        let channel = world.conduit_mut(pos).ok_or(RouteError::NotAConduit(pos))?;
        if !channel.set_triggered(powered) {
            return Ok(None);
        }
        debug!("Channel at {} powered", pos);
        self.activate(world, pos)
    }

    /// Routes flow from `source` through the network rooted at `root` to every
    /// mold table that can take the fluid.
    pub fn route_from_source<W: FlowWorld + ?Sized>(
        &self,
        world: &mut W,
        source: Position,
        root: Position,
    ) -> Result<Activation, RouteError> {
        let start = Instant::now();

        let crucible = world.source(source).ok_or(RouteError::NotASource(source))?;
        if !world.is_conduit(root) {
            return Err(RouteError::NotAConduit(root));
        }
        let root_link = FlowLink::between(root, source)
            .filter(|link| link.distance == 1)
            .ok_or(RouteError::SourceNotAdjacent {
                crucible: source,
                root,
            })?;

        let mut activation = Activation::empty(source, root);
        let Some(handle) = crucible.fluid_handler_if_available(None) else {
            debug!("Crucible at {} has nothing to pour", source);
            self.metrics.record_empty_activation();
            return Ok(activation);
        };
        let sample = handle.sample();

        // 1. Discovery
        let t_discovery = Instant::now();
        let mut discovery = discover(&*world, root, self.config.max_drop);
        activation.filtered = filter_sinks(&*world, &mut discovery, &sample);
        self.metrics.record_discovery(t_discovery.elapsed(), discovery.conduits.len());

        if discovery.sinks.is_empty() {
            debug!("No mold table from {} can take {}", root, handle.fluid);
            self.metrics.record_sinks(0, activation.filtered.len());
            self.metrics.record_empty_activation();
            return Ok(activation);
        }

        // 2. Pathfinding
        let t_paths = Instant::now();
        let graph = FlowGraph::build(&discovery);
        let mut plan = FlowPlan::new();
        for &sink in &discovery.sinks {
            let path = graph.path_from(sink)?;
            activation.hops += plan.record_path(&path)?;
            activation.sinks.push(sink);
        }
        self.metrics.record_pathfinding(t_paths.elapsed(), activation.hops);

        // 3. Annotation
        let t_annotate = Instant::now();
        activation.conduits = plan.apply(world, root, root_link, source, &handle.fluid);
        self.metrics.record_annotation(t_annotate.elapsed());

        activation.sinks.sort();
        activation.fluid = Some(handle.fluid);
        self.metrics.record_sinks(activation.sinks.len(), activation.filtered.len());
        self.metrics.record_activation(start.elapsed());

        info!(
            "Routed {} from {} via {} channels to {} mold tables ({} filtered) in {:?}",
            activation.fluid.as_ref().map_or("?", FluidId::as_str),
            source,
            activation.conduits,
            activation.sinks.len(),
            activation.filtered.len(),
            start.elapsed()
        );
        Ok(activation)
    }

    pub fn notify_broken_link<W: FlowWorld + ?Sized>(
        &self,
        world: &mut W,
        pos: Position,
        count: i32,
    ) -> usize {
        let cleared = link::notify_broken_link(world, pos, count);
        self.metrics.record_break_notification(cleared);
        cleared
    }

    pub fn link_is_broken<W: FlowWorld + ?Sized>(&self, world: &W, pos: Position) -> bool {
        let broken = link::link_is_broken(world, pos);
        self.metrics.record_integrity_check(broken);
        broken
    }

    pub fn finish_flow<W: FlowWorld + ?Sized>(&self, world: &mut W, sink: Position) -> usize {
        let cleared = link::finish_flow(world, sink);
        self.metrics.record_break_notification(cleared);
        cleared
    }

    pub fn remove_conduit<W: FlowWorld + ?Sized>(&self, world: &mut W, pos: Position) -> usize {
        let cleared = link::remove_conduit(world, pos);
        self.metrics.record_break_notification(cleared);
        cleared
    }

    pub fn remove_sink<W: FlowWorld + ?Sized>(&self, world: &mut W, pos: Position) -> usize {
        let cleared = link::remove_sink(world, pos);
        self.metrics.record_break_notification(cleared);
        cleared
    }

    pub fn connections<W: FlowWorld + ?Sized>(&self, world: &W, pos: Position) -> Vec<Direction> {
        link::connections(world, pos, self.config.max_drop)
    }

    /// Advances one mold table by one tick.
    pub fn tick_sink<W: FlowWorld + ?Sized>(
        &self,
        world: &mut W,
        sink: Position,
        game_time: u64,
    ) -> SinkTick {
        let mut tick = SinkTick::default();
        let Some(table) = world.sink(sink) else {
            return tick;
        };
        self.metrics.record_sink_tick();
        let has_output = table.has_unclaimed_output();
        let link = table.link().cloned();

        if has_output {
            if link.is_some() {
                self.finish_flow(world, sink);
                tick.finished = true;
            }
            return tick;
        }

        if let Some(link) = link {
            if game_time % self.config.draw_interval.max(1) == 0 {
                let handle = world
                    .source(link.source)
                    .and_then(|c| c.fluid_handler_if_available(Some(&link.fluid)));
                let one = FluidStack::new(link.fluid.clone(), 1);
                let fits = world.sink(sink).is_some_and(|t| t.simulate_fill(&one));

                match handle {
                    Some(handle) if fits && !self.link_is_broken(&*world, sink) => {
                        let drained = world
                            .source_mut(link.source)
                            .and_then(|c| c.drain(1, FluidAction::Execute));
                        if let (Some(stack), Some(table)) = (drained, world.sink_mut(sink)) {
                            tick.drawn = table.fill(&stack, FluidAction::Execute);
                            table.set_mold_temperature(handle.temperature);
                            self.metrics.record_fluid_drawn(tick.drawn as u64);
                        }
                    }
                    _ => {
                        debug!("Mold table at {} stops drawing from {}", sink, link.source);
                        self.finish_flow(world, sink);
                        tick.finished = true;
                    }
                }
            }
        }

        if let Some(table) = world.sink_mut(sink) {
            if !table.has_source() {
                table.cool(self.config.cooling_per_tick);
                if table.try_solidify(self.config.solidify_below) {
                    tick.cast = true;
                    self.metrics.record_cast();
                    info!("Cast finished at {}", sink);
                }
            }
        }
        tick
    }

    /// Advances every mold table by one tick, in position order.
    pub fn tick<W: FlowWorld + ?Sized>(&self, world: &mut W, game_time: u64) -> TickSummary {
        let mut summary = TickSummary::default();
        for sink in world.sink_positions() {
            let tick = self.tick_sink(world, sink, game_time);
            summary.sinks += 1;
            summary.drawn += tick.drawn as u64;
            summary.finished += tick.finished as usize;
            summary.casts += tick.cast as usize;
        }
        summary
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouteConfig::default())
    }
}
