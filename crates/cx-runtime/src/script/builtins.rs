use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Position, FLOAT, INT};

use super::rng::{next_random_bounded, roll_dice};
use crate::helpers::rhai_bridge::dynamic_items_equal;

/// Registers the container helpers for one item type. Rhai dispatches on the
/// concrete argument types, so each type gets its own overload set.
macro_rules! register_container_helpers {
    ($engine:expr, $item:ty) => {{
        $engine.register_fn("contains", |list: &mut Array, item: $item| -> bool {
            let item = Dynamic::from(item);
            list.iter().any(|value| dynamic_items_equal(value, &item))
        });
        $engine.register_fn("insert", |list: &mut Array, item: $item| {
            list.push(Dynamic::from(item));
        });
        $engine.register_fn("remove", |list: &mut Array, item: $item| -> bool {
            let item = Dynamic::from(item);
            match list.iter().position(|value| dynamic_items_equal(value, &item)) {
                Some(index) => {
                    let _ = list.remove(index);
                    true
                }
                None => false,
            }
        });
        $engine.register_fn("remove_all", |list: &mut Array, item: $item| -> INT {
            let item = Dynamic::from(item);
            let before = list.len();
            list.retain(|value| !dynamic_items_equal(value, &item));
            (before - list.len()) as INT
        });
        $engine.register_fn("count", |list: &mut Array, item: $item| -> INT {
            let item = Dynamic::from(item);
            list.iter()
                .filter(|value| dynamic_items_equal(value, &item))
                .count() as INT
        });
    }};
}

/// Registers the story helper routines.
///
/// Dice: `dice(count, sides, modifier)`, `dice(count, sides)`, `d(sides)` and
/// `random(bound)` (zero based, exclusive). Containers: `contains`, `insert`,
/// `remove`, `remove_all` and `count`, all taking `(list, item)` and matching
/// items by value. The container helpers get one overload per item type so
/// that `remove(list, 2)` removes the item `2`, not the element at index 2.
pub(crate) fn register_builtins(engine: &mut Engine, rng_state: &Rc<RefCell<u32>>) {
    register_dice(engine, rng_state);
    register_container_helpers!(engine, INT);
    register_container_helpers!(engine, FLOAT);
    register_container_helpers!(engine, bool);
    register_container_helpers!(engine, ImmutableString);
    register_container_helpers!(engine, Dynamic);
}

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

fn checked_dice(
    rng_state: &Rc<RefCell<u32>>,
    count: INT,
    sides: INT,
    modifier: INT,
) -> Result<INT, Box<EvalAltResult>> {
    if sides <= 0 || sides > INT::from(u32::MAX) {
        return Err(runtime_error(format!(
            "dice expects a positive number of sides, got {}.",
            sides
        )));
    }
    let count = count.clamp(0, INT::from(u32::MAX)) as u32;
    let mut state = rng_state.borrow_mut();
    roll_dice(&mut state, count, sides as u32)
        .checked_add(modifier)
        .ok_or_else(|| runtime_error(format!("dice modifier {} overflows the roll.", modifier)))
}

fn register_dice(engine: &mut Engine, rng_state: &Rc<RefCell<u32>>) {
    let state = Rc::clone(rng_state);
    engine.register_fn(
        "dice",
        move |count: INT, sides: INT, modifier: INT| -> Result<INT, Box<EvalAltResult>> {
            checked_dice(&state, count, sides, modifier)
        },
    );

    let state = Rc::clone(rng_state);
    engine.register_fn(
        "dice",
        move |count: INT, sides: INT| -> Result<INT, Box<EvalAltResult>> {
            checked_dice(&state, count, sides, 0)
        },
    );

    let state = Rc::clone(rng_state);
    engine.register_fn("d", move |sides: INT| -> Result<INT, Box<EvalAltResult>> {
        checked_dice(&state, 1, sides, 0)
    });

    let state = Rc::clone(rng_state);
    engine.register_fn(
        "random",
        move |bound: INT| -> Result<INT, Box<EvalAltResult>> {
            if bound <= 0 || bound > INT::from(u32::MAX) {
                return Err(runtime_error("random(n) expects positive integer n."));
            }
            let mut state = state.borrow_mut();
            Ok(INT::from(next_random_bounded(&mut state, bound as u32)))
        },
    );
}
