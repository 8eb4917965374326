//! Begin phase of a unit of work
//!
//! Renders one fiber according to its tag and reconciles its children.
//! Returns the first child to descend into, or `None` when the fiber is a
//! leaf and should be completed.

use serde_json::Value;

use crate::child_reconciler::ChildReconciler;
use crate::diagnostics::Diagnostics;
use crate::element::{Child, ElementType};
use crate::errors::ReconcileError;
use crate::fiber::{FiberArena, FiberId, FiberProps, FiberState, Flags, UpdateQueue, WorkTag};
use crate::hooks::{Hooks, RenderInterrupt};
use crate::render_context::RenderContext;

pub(crate) fn begin_work(
    arena: &mut FiberArena,
    ctx: &mut RenderContext,
    diagnostics: &mut Diagnostics,
    wip: FiberId,
) -> Result<Option<FiberId>, RenderInterrupt> {
    tracing::trace!(fiber = %wip, tag = ?arena[wip].tag, "begin_work");

    match arena[wip].tag {
        WorkTag::HostRoot => update_host_root(arena, ctx, diagnostics, wip),
        WorkTag::HostComponent => {
            let children = element_children(arena, wip)?;
            Ok(reconcile_children(arena, diagnostics, wip, &children))
        }
        WorkTag::HostText => Ok(None),
        WorkTag::FunctionComponent => update_function_component(arena, ctx, diagnostics, wip),
        WorkTag::Fragment => {
            let children = match &arena[wip].pending_props {
                FiberProps::Children(children) => children.clone(),
                _ => Child::Empty,
            };
            Ok(reconcile_children(arena, diagnostics, wip, &children))
        }
        WorkTag::ContextProvider => update_context_provider(arena, ctx, diagnostics, wip),
    }
}

fn invariant(message: String) -> RenderInterrupt {
    RenderInterrupt::Failed(ReconcileError::InvariantViolation { message })
}

fn element_children(arena: &FiberArena, wip: FiberId) -> Result<Child, RenderInterrupt> {
    match arena[wip].pending_props.element() {
        Some(element) => Ok(element.children_as_child()),
        None => Err(invariant(format!("{} has no element props", wip))),
    }
}

/// Reconcile against the committed twin's children, tracking effects only
/// when this fiber already existed in the committed tree.
fn reconcile_children(
    arena: &mut FiberArena,
    diagnostics: &mut Diagnostics,
    wip: FiberId,
    children: &Child,
) -> Option<FiberId> {
    let first = match arena[wip].alternate {
        Some(current) => {
            let current_first_child = arena[current].child;
            ChildReconciler::new(arena, diagnostics, true).reconcile_child_fibers(
                wip,
                current_first_child,
                children,
            )
        }
        None => ChildReconciler::new(arena, diagnostics, false).reconcile_child_fibers(wip, None, children),
    };
    arena[wip].child = first;
    first
}

fn update_host_root(
    arena: &mut FiberArena,
    ctx: &mut RenderContext,
    diagnostics: &mut Diagnostics,
    wip: FiberId,
) -> Result<Option<FiberId>, RenderInterrupt> {
    let fiber = &arena[wip];
    let UpdateQueue::Root { shared, .. } = &fiber.update_queue else {
        return Err(invariant("host root without an update queue".to_string()));
    };
    let shared = shared.clone();

    let (state, rebase) = shared.borrow().process_root(ctx.render_lanes());
    let fiber = &mut arena[wip];
    if !rebase.is_empty() {
        fiber.flags |= Flags::CONSUMED_UPDATES;
    }
    fiber.memoized_state = FiberState::Root(state.clone());
    fiber.update_queue = UpdateQueue::Root {
        shared,
        rebase: Some(rebase),
    };

    Ok(reconcile_children(arena, diagnostics, wip, &state))
}

fn update_function_component(
    arena: &mut FiberArena,
    ctx: &mut RenderContext,
    diagnostics: &mut Diagnostics,
    wip: FiberId,
) -> Result<Option<FiberId>, RenderInterrupt> {
    let Some(element) = arena[wip].pending_props.element().cloned() else {
        return Err(invariant(format!("{} has no element props", wip)));
    };
    let ElementType::Function(component) = &element.element_type else {
        return Err(invariant(format!("{} is not a function component", wip)));
    };

    let previous = arena[wip].alternate.map(|current| match &arena[current].memoized_state {
        FiberState::Hooks(hooks) => hooks.clone(),
        _ => Vec::new(),
    });

    let mut hooks = Hooks::new(wip, component.name(), previous, ctx);
    let children = component.render(&element, &mut hooks)?;
    let outcome = hooks.finish()?;

    let fiber = &mut arena[wip];
    fiber.memoized_state = FiberState::Hooks(outcome.hooks);
    fiber.update_queue = UpdateQueue::Effects(outcome.effects);
    if outcome.has_passive {
        fiber.flags |= Flags::PASSIVE_EFFECT;
    }
    if outcome.consumed_updates {
        fiber.flags |= Flags::CONSUMED_UPDATES;
    }

    Ok(reconcile_children(arena, diagnostics, wip, &children))
}

fn update_context_provider(
    arena: &mut FiberArena,
    ctx: &mut RenderContext,
    diagnostics: &mut Diagnostics,
    wip: FiberId,
) -> Result<Option<FiberId>, RenderInterrupt> {
    let Some(element) = arena[wip].pending_props.element().cloned() else {
        return Err(invariant(format!("{} has no element props", wip)));
    };
    let ElementType::Provider(context) = &element.element_type else {
        return Err(invariant(format!("{} is not a context provider", wip)));
    };

    let value = element.attr_value("value").cloned().unwrap_or(Value::Null);
    ctx.push_provider(context, value);
    Ok(reconcile_children(arena, diagnostics, wip, &element.children_as_child()))
}
