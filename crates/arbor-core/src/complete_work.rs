//! Complete phase of a unit of work
//!
//! Runs bottom-up once all of a fiber's children are complete: creates
//! detached host instances for new host fibers, computes update payloads for
//! reused ones, and bubbles child flags into `subtree_flags`.

use std::rc::Rc;

use crate::element::ElementType;
use crate::fiber::{FiberArena, FiberId, Flags, WorkTag};
use crate::host::{HostConfig, HostNodeId, UpdatePayload};
use crate::render_context::RenderContext;

pub(crate) fn complete_work<H: HostConfig>(
    arena: &mut FiberArena,
    ctx: &mut RenderContext,
    host: &mut H,
    wip: FiberId,
) {
    match arena[wip].tag {
        WorkTag::HostComponent => complete_host_component(arena, ctx, host, wip),
        WorkTag::HostText => complete_host_text(arena, ctx, host, wip),
        WorkTag::ContextProvider => ctx.pop_provider(),
        WorkTag::HostRoot | WorkTag::FunctionComponent | WorkTag::Fragment => {}
    }
    bubble_properties(arena, wip);
}

fn complete_host_component<H: HostConfig>(
    arena: &mut FiberArena,
    ctx: &mut RenderContext,
    host: &mut H,
    wip: FiberId,
) {
    let Some(element) = arena[wip].pending_props.element().cloned() else {
        return;
    };
    let current = arena[wip].alternate;

    if let (Some(current), Some(_)) = (current, arena[wip].state_node) {
        let Some(old) = arena[current].memoized_props.element().cloned() else {
            return;
        };
        if Rc::ptr_eq(&old, &element) {
            return;
        }
        if let Some(payload) = UpdatePayload::diff(&old.attrs, &element.attrs) {
            let fiber = &mut arena[wip];
            fiber.update_payload = Some(payload);
            fiber.flags |= Flags::UPDATE;
        }
        return;
    }

    let ElementType::Host(tag) = &element.element_type else {
        return;
    };
    let instance = host.create_instance(tag, &element.attrs);
    append_all_children(arena, host, instance, wip);
    arena[wip].state_node = Some(instance);
    ctx.host_nodes_created += 1;
}

fn complete_host_text<H: HostConfig>(
    arena: &mut FiberArena,
    ctx: &mut RenderContext,
    host: &mut H,
    wip: FiberId,
) {
    let Some(text) = arena[wip].pending_props.text().map(str::to_string) else {
        return;
    };
    let current = arena[wip].alternate;

    if let (Some(current), Some(_)) = (current, arena[wip].state_node) {
        if arena[current].memoized_props.text() != Some(text.as_str()) {
            arena[wip].flags |= Flags::UPDATE;
        }
        return;
    }

    let instance = host.create_text_instance(&text);
    arena[wip].state_node = Some(instance);
    ctx.host_nodes_created += 1;
}

/// Attach the top-level host nodes below `wip` to its new instance,
/// looking through non-host fibers.
fn append_all_children<H: HostConfig>(
    arena: &FiberArena,
    host: &mut H,
    parent: HostNodeId,
    wip: FiberId,
) {
    let mut node = arena[wip].child;
    while let Some(id) = node {
        let fiber = &arena[id];
        if fiber.tag.is_host() {
            if let Some(instance) = fiber.state_node {
                host.append_initial_child(parent, instance);
            }
        } else if let Some(child) = fiber.child {
            node = Some(child);
            continue;
        }

        let mut cursor = id;
        loop {
            if cursor == wip {
                return;
            }
            if let Some(sibling) = arena[cursor].sibling {
                node = Some(sibling);
                break;
            }
            match arena[cursor].return_ {
                Some(parent_fiber) if parent_fiber != wip => cursor = parent_fiber,
                _ => return,
            }
        }
    }
}

fn bubble_properties(arena: &mut FiberArena, wip: FiberId) {
    let mut subtree_flags = Flags::empty();
    let mut child = arena[wip].child;
    while let Some(id) = child {
        let fiber = &mut arena[id];
        subtree_flags |= fiber.subtree_flags | fiber.flags;
        fiber.return_ = Some(wip);
        child = fiber.sibling;
    }
    arena[wip].subtree_flags |= subtree_flags;
}
