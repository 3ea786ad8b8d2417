use crate::scene::components::{EntityInfo, Name};
use crate::scene::internal::transforms;
use crate::scene::transform::Transform;
use hecs::{Entity, World};
use std::fmt::Write;

/// Indented dump of the subtree under `root`: one line per entity with its
/// name, component types and world bounds.
pub(crate) fn describe_hierarchy(world: &World, root: Entity) -> String {
    let mut out = String::new();
    let mut stack = vec![(root, 0usize)];

    while let Some((entity, depth)) = stack.pop() {
        let name = world
            .get::<&Name>(entity)
            .map(|name| name.0.clone())
            .unwrap_or_else(|_| format!("{:?}", entity));
        let components = world
            .get::<&EntityInfo>(entity)
            .map(|info| {
                info.components()
                    .iter()
                    .map(|ty| ty.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let bounds = match transforms::world_bounds(world, entity) {
            Some(b) if !b.is_empty() => format!(
                "[{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
                b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
            ),
            _ => "empty".to_string(),
        };

        let _ = writeln!(
            out,
            "{}{} ({}) bounds {}",
            "  ".repeat(depth),
            name,
            components,
            bounds
        );

        let children = world
            .get::<&Transform>(entity)
            .map(|t| t.children().to_vec())
            .unwrap_or_default();
        for &child in children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    out
}

pub(crate) fn debug_print_hierarchy(world: &World, root: Entity) {
    log::info!("=== Hierarchy Debug ===");
    for line in describe_hierarchy(world, root).lines() {
        log::info!("{}", line);
    }
    log::info!("=======================");
}
