//! Given-When-Then harness for reducers.
//!
//! Lifecycle scenarios usually need several actions in a row (create, submit,
//! analyse, price...), so the harness accepts a sequence of actions and
//! collects the effects of the last one.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use kimbo_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use kimbo_testing::ReducerTest;
///
/// ReducerTest::new(ProcurementReducer::new())
///     .with_env(test_environment())
///     .given_state(ProcurementState::loaded(request, Version::new(1)))
///     .when_action(cancel_with("No longer needed"))
///     .then_state(|state| {
///         assert!(state.last_error.is_none());
///     })
///     .then_effects(|effects| {
///         assert_eq!(effects.len(), 1);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Append an action to run (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Append several actions, reduced in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, actions, or environment are not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use kimbo_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {expected} effects, but found {}",
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// Persistence of a stage write is always described as a future.
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kimbo_core::effect::Effect;
    use kimbo_core::reducer::Reducer;
    use smallvec::{SmallVec, smallvec};

    #[derive(Clone, Debug, Default)]
    struct ApprovalState {
        approvals: u32,
        refused: bool,
    }

    #[derive(Clone, Debug)]
    enum ApprovalAction {
        Approve,
        Refuse,
    }

    struct ApprovalReducer;

    struct NoEnv;

    impl Reducer for ApprovalReducer {
        type State = ApprovalState;
        type Action = ApprovalAction;
        type Environment = NoEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                ApprovalAction::Approve => {
                    state.approvals += 1;
                    smallvec![Effect::None]
                },
                ApprovalAction::Refuse => {
                    state.refused = true;
                    smallvec![Effect::Future(Box::pin(async { None }))]
                },
            }
        }
    }

    #[test]
    fn single_action_updates_state() {
        ReducerTest::new(ApprovalReducer)
            .with_env(NoEnv)
            .given_state(ApprovalState::default())
            .when_action(ApprovalAction::Approve)
            .then_state(|state| assert_eq!(state.approvals, 1))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn action_sequence_reports_last_effects() {
        ReducerTest::new(ApprovalReducer)
            .with_env(NoEnv)
            .given_state(ApprovalState::default())
            .when_actions([ApprovalAction::Approve, ApprovalAction::Refuse])
            .then_state(|state| {
                assert_eq!(state.approvals, 1);
                assert!(state.refused);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn no_effects_accepts_empty_and_none() {
        assertions::assert_no_effects::<ApprovalAction>(&[Effect::None]);
        assertions::assert_no_effects::<ApprovalAction>(&[]);
    }
}
