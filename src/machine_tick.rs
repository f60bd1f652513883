use log::*;

pub const MAX_STATE_TRANSITIONS: u32 = 20;

/// Re-enter `tick_fn` for as long as it hands back a successor state, all within
/// the current tick. Capped at `MAX_STATE_TRANSITIONS` so a program that keeps
/// jumping cannot stall the tick. Returns how many transitions were taken.
pub fn run_state_machine<S, F>(state: &mut S, label: &str, mut tick_fn: F) -> Result<u32, String>
where
    F: FnMut(&mut S) -> Result<Option<S>, String>,
{
    let mut transitions = 0u32;

    while let Some(next) = tick_fn(state)? {
        *state = next;
        transitions += 1;

        if transitions >= MAX_STATE_TRANSITIONS {
            error!(
                "State machine '{}' took {} transitions in one tick, deferring the rest to the next tick",
                label, MAX_STATE_TRANSITIONS
            );
            break;
        }
    }

    Ok(transitions)
}
