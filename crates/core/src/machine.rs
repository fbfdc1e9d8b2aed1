//! State-machine contract for the session protocols.

/// Decide/evolve split for small protocol state machines.
///
/// - **Decision logic**: `handle(&self, input)` returns the transitions to take,
///   or an error when the current state forbids the input.
/// - **State mutation**: `apply(&mut self, transition)` evolves state.
///
/// Implementations must not perform I/O. Drivers perform the side effects and
/// feed the outcome back as new inputs.
pub trait StateMachine {
    type State: Clone + PartialEq + core::fmt::Debug;
    type Input: Clone + core::fmt::Debug;
    type Transition: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Current state.
    fn state(&self) -> &Self::State;

    /// Evolve in-memory state from a single transition.
    fn apply(&mut self, transition: &Self::Transition);

    /// Decide which transitions follow from the current state and an input.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, input: &Self::Input) -> Result<Vec<Self::Transition>, Self::Error>;

    /// Handle an input and apply every resulting transition.
    fn execute(&mut self, input: &Self::Input) -> Result<Vec<Self::Transition>, Self::Error> {
        let transitions = self.handle(input)?;
        for transition in &transitions {
            self.apply(transition);
        }
        Ok(transitions)
    }
}
