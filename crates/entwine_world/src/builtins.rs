//! Runtime bindings for the built-in functions.
//!
//! [`bind`] produces the dispatch table the VM calls through, one closure
//! per function definition in the object table, plus the quantity-check
//! fast path. Bindings read the pocket and inventory for the current run;
//! the age-dependent zero-arg functions are constants chosen per search.

use crate::inventory::Inventory;
use crate::pocket::Pocket;
use crate::store::Entity;
use entwine_logic::error::{LinkError, RuntimeError};
use entwine_logic::objects::{Object, PtrTag, Table};
use entwine_logic::vm::{BuiltInFn, BuiltInFunctions, QuantityFn};

/// The two explorable ages.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Age {
    Child,
    Adult,
}

/// Options a binding set depends on beyond the pocket.
#[derive(Clone, Copy, Debug)]
pub struct Bindings {
    /// The age this search runs as.
    pub age: Age,
    /// The resolved starting age of the run.
    pub starting_age: Age,
    /// Whether ocarina notes are shuffled into the item pool.
    pub notes_shuffled: bool,
}

/// Builds the dispatch table and the CHK_QTY fast function.
///
/// Every function definition in the object table must have a binding here;
/// a name without one is a [`LinkError`].
pub fn bind<'w>(
    table: &Table,
    pocket: &'w Pocket,
    inventory: &'w Inventory,
    bindings: Bindings,
) -> Result<(BuiltInFunctions<'w>, QuantityFn<'w>), LinkError> {
    let mut funcs: Vec<BuiltInFn<'w>> = Vec::with_capacity(table.function_count());
    for index in 0..table.function_count() {
        let def = table
            .function(index as u32)
            .ok_or(LinkError::MissingBuiltIn {
                name: format!("#{index}"),
            })?;
        funcs.push(binding_for(&def.name, pocket, inventory, bindings)?);
    }

    let chk_qty: QuantityFn<'w> = Box::new(move |_, what, qty| {
        let token = token_entity(what)?;
        Ok(Object::pack_bool(pocket.has(inventory, token, qty)))
    });

    Ok((BuiltInFunctions::new(funcs), chk_qty))
}

fn binding_for<'w>(
    name: &str,
    pocket: &'w Pocket,
    inventory: &'w Inventory,
    bindings: Bindings,
) -> Result<BuiltInFn<'w>, LinkError> {
    let func: BuiltInFn<'w> = match name {
        "has" => Box::new(move |table, args| {
            if args.len() != 2 {
                return Err(RuntimeError::Arity {
                    name: "has".into(),
                    expects: 2,
                    got: args.len(),
                });
            }
            let token = token_entity(args[0])?;
            let qty = number_arg(table, args[1])?;
            Ok(Object::pack_bool(pocket.has(inventory, token, qty)))
        }),

        "has_anyof" => Box::new(move |_, args| {
            let entities = token_entities(args)?;
            Ok(Object::pack_bool(pocket.has_any(inventory, &entities)))
        }),

        "has_every" => Box::new(move |_, args| {
            let entities = token_entities(args)?;
            Ok(Object::pack_bool(pocket.has_every(inventory, &entities)))
        }),

        "has_bottle" => Box::new(move |_, _| Ok(Object::pack_bool(pocket.has_bottle(inventory)))),

        "has_stones" => Box::new(move |table, args| {
            let n = number_arg(table, args[0])?;
            Ok(Object::pack_bool(pocket.has_stones(inventory, n)))
        }),

        "has_medallions" => Box::new(move |table, args| {
            let n = number_arg(table, args[0])?;
            Ok(Object::pack_bool(pocket.has_medallions(inventory, n)))
        }),

        "has_dungeon_rewards" => Box::new(move |table, args| {
            let n = number_arg(table, args[0])?;
            Ok(Object::pack_bool(pocket.has_dungeon_rewards(inventory, n)))
        }),

        "has_hearts" => Box::new(move |table, args| {
            let n = number_arg(table, args[0])?;
            Ok(Object::pack_bool(pocket.has_hearts(inventory, n)))
        }),

        "has_notes_for_song" => {
            if bindings.notes_shuffled {
                Box::new(move |_, args| {
                    let song = token_entity(args[0])?;
                    let answer = pocket
                        .has_all_notes(inventory, song)
                        .map_err(|err| RuntimeError::Type(err.to_string()))?;
                    Ok(Object::pack_bool(answer))
                })
            } else {
                const_bool(true)
            }
        }

        "is_adult" => const_bool(bindings.age == Age::Adult),
        "is_child" => const_bool(bindings.age == Age::Child),
        "is_starting_age" => const_bool(bindings.age == bindings.starting_age),

        // time-of-day simulation is not modelled; gates that survive to
        // runtime stay open
        "check_tod" | "check_tod_access" => const_bool(true),

        "needs_hearts_for_damage_multiplier" => Box::new(move |_, _| {
            log::warn!("unimplemented function called: needs_hearts_for_damage_multiplier");
            Ok(Object::TRUE)
        }),

        "can_live_dmg" => Box::new(move |table, args| {
            let args = normalize_can_live_dmg(args)?;
            if number_arg(table, args[0]).is_err()
                || !is_bool(args[1])
                || !is_bool(args[2])
            {
                let types: Vec<&str> = args.iter().map(|a| a.type_name()).collect();
                return Err(RuntimeError::Type(format!(
                    "can_live_dmg(f64, bool, bool) expected, have can_live_dmg({})",
                    types.join(",")
                )));
            }
            log::warn!("unimplemented function called: can_live_dmg");
            Ok(Object::TRUE)
        }),

        other => {
            return Err(LinkError::MissingBuiltIn {
                name: other.to_string(),
            })
        }
    };
    Ok(func)
}

/// Pads one- and two-argument calls out to three with false, warning each
/// time; anything past three is an error.
fn normalize_can_live_dmg(args: &[Object]) -> Result<[Object; 3], RuntimeError> {
    match args {
        [dmg] => {
            log::warn!("vararg func called short: can_live_dmg");
            Ok([*dmg, Object::FALSE, Object::FALSE])
        }
        [dmg, fairy] => {
            log::warn!("vararg func called short: can_live_dmg");
            Ok([*dmg, *fairy, Object::FALSE])
        }
        [dmg, fairy, nayrus] => Ok([*dmg, *fairy, *nayrus]),
        _ => Err(RuntimeError::Arity {
            name: "can_live_dmg".into(),
            expects: 3,
            got: args.len(),
        }),
    }
}

fn const_bool<'w>(value: bool) -> BuiltInFn<'w> {
    let object = Object::pack_bool(value);
    Box::new(move |_, _| Ok(object))
}

fn is_bool(obj: Object) -> bool {
    obj == Object::TRUE || obj == Object::FALSE
}

fn token_entity(obj: Object) -> Result<Entity, RuntimeError> {
    obj.unpack_ptr()
        .filter(|ptr| ptr.tag == PtrTag::Token)
        .map(|ptr| Entity::new(ptr.addr))
        .ok_or_else(|| {
            RuntimeError::Type(format!("expected a token ptr, have {}", obj.type_name()))
        })
}

fn token_entities(args: &[Object]) -> Result<Vec<Entity>, RuntimeError> {
    args.iter().map(|arg| token_entity(*arg)).collect()
}

fn number_arg(table: &Table, obj: Object) -> Result<f64, RuntimeError> {
    table
        .number(obj)
        .ok_or_else(|| RuntimeError::Type(format!("expected a number, have {}", obj.type_name())))
}
