//! A manager for the state of a single simulation run.
//!
//! A `Context` owns everything that belongs to one run: the plan queue that drives
//! simulated time, and a set of type-keyed *data plugins* holding the population,
//! restrictions, random number generators and so on. Independent runs use independent
//! contexts and never share mutable state.
//!
//! Plans are callbacks of the form `FnOnce(&mut Context) -> Result<(), EpisimError>`.
//! `execute()` runs them in time order and stops at the first error.
use std::any::{Any, TypeId};
use std::fmt::{Display, Formatter};

use log::trace;

use crate::error::EpisimError;
use crate::hashing::HashMap;
use crate::plan::Queue;

/// A data plugin stores one piece of per-run state, keyed by the plugin's type.
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in a `Context`.
///
/// ```ignore
/// define_data_plugin!(CounterPlugin, Vec<u32>, Vec::new());
/// ```
#[macro_export]
macro_rules! define_data_plugin {
    ($vis:vis $plugin:ident, $data_container:ty, $default: expr) => {
        #[derive(Copy, Clone)]
        $vis struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

/// Plans scheduled for the same time run phase by phase, `First` to `Last`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutionPhase {
    First,
    Normal,
    Last,
}

impl Display for ExecutionPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

type Callback = dyn FnOnce(&mut Context) -> Result<(), EpisimError>;

pub struct Context {
    plan_queue: Queue<Box<Callback>, ExecutionPhase>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: Queue::new(),
            data_plugins: HashMap::default(),
            current_time: 0.0,
            shutdown_requested: false,
        }
    }

    /// Add a plan to the queue at the specified time with `ExecutionPhase::Normal`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) -> Result<(), EpisimError> + 'static,
    ) {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal);
    }

    /// Add a plan to the queue at the specified time and phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) -> Result<(), EpisimError> + 'static,
        phase: ExecutionPhase,
    ) {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Invalid time value: {time}"
        );
        self.plan_queue.add_plan(time, Box::new(callback), phase);
    }

    /// Number of plans waiting to run.
    #[must_use]
    pub fn remaining_plan_count(&self) -> usize {
        self.plan_queue.len()
    }

    /// Gets the data container for the plugin, creating it from the plugin's default
    /// on first access.
    #[allow(clippy::missing_panics_doc)]
    pub fn get_data_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            // Keyed by `TypeId::of::<T>()`, so the stored value is always `T::DataContainer`.
            .unwrap()
    }

    /// Gets the data container for the plugin, or `None` if nothing has touched it yet.
    #[must_use]
    pub fn get_data<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|data| data.downcast_ref::<T::DataContainer>())
    }

    /// Current simulation time in seconds since the start of day 0.
    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Stop executing plans after the current one returns. Remaining plans are dropped.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at t={}", self.current_time);
        self.shutdown_requested = true;
    }

    /// Execute the simulation until the plan queue is empty, a shutdown was requested
    /// or a plan fails.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a plan. Plans queued behind it are discarded.
    pub fn execute(&mut self) -> Result<(), EpisimError> {
        trace!("entering event loop");
        while !self.shutdown_requested {
            let Some(plan) = self.plan_queue.get_next_plan() else {
                break;
            };
            self.current_time = plan.time;
            if let Err(error) = (plan.data)(self) {
                self.plan_queue.clear();
                return Err(error);
            }
        }
        self.plan_queue.clear();
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    define_data_plugin!(ComponentA, Vec<u32>, vec![]);

    fn add_plan(context: &mut Context, time: f64, value: u32) {
        context.add_plan(time, move |context| {
            context.get_data_mut(ComponentA).push(value);
            Ok(())
        });
    }

    #[test]
    #[should_panic(expected = "Invalid time value")]
    fn negative_plan_time() {
        let mut context = Context::new();
        add_plan(&mut context, -1.0, 0);
    }

    #[test]
    #[should_panic(expected = "Invalid time value")]
    fn infinite_plan_time() {
        let mut context = Context::new();
        add_plan(&mut context, f64::INFINITY, 0);
    }

    #[test]
    #[should_panic(expected = "Invalid time value")]
    fn nan_plan_time() {
        let mut context = Context::new();
        add_plan(&mut context, f64::NAN, 0);
    }

    #[test]
    fn empty_context() {
        let mut context = Context::new();
        context.execute().unwrap();
        assert_eq!(context.get_current_time(), 0.0);
        assert!(context.get_data(ComponentA).is_none());
    }

    #[test]
    fn timed_plan_only() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        context.execute().unwrap();
        assert_eq!(context.get_current_time(), 1.0);
        assert_eq!(*context.get_data(ComponentA).unwrap(), vec![1]);
    }

    #[test]
    fn plan_adds_plan() {
        let mut context = Context::new();
        context.add_plan(1.0, |context| {
            context.get_data_mut(ComponentA).push(1);
            add_plan(context, 2.0, 2);
            Ok(())
        });
        context.execute().unwrap();
        assert_eq!(context.get_current_time(), 2.0);
        assert_eq!(*context.get_data(ComponentA).unwrap(), vec![1, 2]);
    }

    #[test]
    fn plans_at_same_time_fire_in_order() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        add_plan(&mut context, 1.0, 2);
        context.execute().unwrap();
        assert_eq!(*context.get_data(ComponentA).unwrap(), vec![1, 2]);
    }

    #[test]
    fn phases_order_plans_at_same_time() {
        let mut context = Context::new();
        context.add_plan_with_phase(
            1.0,
            |context| {
                context.get_data_mut(ComponentA).push(3);
                Ok(())
            },
            ExecutionPhase::Last,
        );
        add_plan(&mut context, 1.0, 2);
        context.add_plan_with_phase(
            1.0,
            |context| {
                context.get_data_mut(ComponentA).push(1);
                Ok(())
            },
            ExecutionPhase::First,
        );
        context.execute().unwrap();
        assert_eq!(*context.get_data(ComponentA).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn shutdown_drops_remaining_plans() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        context.add_plan(1.5, |context| {
            context.shutdown();
            Ok(())
        });
        add_plan(&mut context, 2.0, 2);
        context.execute().unwrap();
        assert_eq!(context.get_current_time(), 1.5);
        assert_eq!(*context.get_data(ComponentA).unwrap(), vec![1]);
        assert_eq!(context.remaining_plan_count(), 0);
    }

    #[test]
    fn error_aborts_execution() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        context.add_plan(2.0, |_| {
            Err(EpisimError::InvariantViolation("broken".to_string()))
        });
        add_plan(&mut context, 3.0, 3);
        let result = context.execute();
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
        assert_eq!(context.get_current_time(), 2.0);
        assert_eq!(*context.get_data(ComponentA).unwrap(), vec![1]);
    }
}
