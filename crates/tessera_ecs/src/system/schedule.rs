//! Declared system order within a pass.

use crate::config::ScheduleConfig;

use super::entity_system::SystemId;

/// Orders the systems of one pass.
///
/// Systems named in `config.before` come first, in that order. Then every
/// system not placed by the config, in registration order. Then the systems
/// named in `config.after`, in that order. Names with no matching system
/// are skipped.
pub fn resolve_order<'a, I>(config: &ScheduleConfig, systems: I) -> Vec<SystemId>
where
    I: IntoIterator<Item = (SystemId, &'a str)>,
{
    let systems: Vec<(SystemId, &str)> = systems.into_iter().collect();
    let named = |names: &[String]| {
        names
            .iter()
            .filter_map(|name| {
                systems
                    .iter()
                    .find(|(_, n)| *n == name.as_str())
                    .map(|(id, _)| *id)
            })
            .collect::<Vec<_>>()
    };

    let mut order = named(&config.before);
    order.extend(
        systems
            .iter()
            .filter(|(_, name)| !config.is_placed(name))
            .map(|(id, _)| *id),
    );
    order.extend(named(&config.after));
    order
}
