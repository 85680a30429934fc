mod common;

use keelson::compositor::{BufferAssignment, BufferHandle};
use keelson::{ClientId, Display, ErrorCode, SurfaceId};

struct Fixture {
    display: Display,
    client: ClientId,
    parent: SurfaceId,
    child: SurfaceId,
}

fn fixture() -> Fixture {
    let mut display = Display::new();
    let client = display.create_client();
    let parent = display.create_surface(client);
    let child = display.create_surface(client);
    display.get_subsurface(child, parent).unwrap();
    Fixture {
        display,
        client,
        parent,
        child,
    }
}

fn committed_buffer(display: &Display, surface: SurfaceId) -> Option<BufferAssignment> {
    display.surface_state(surface).and_then(|state| state.buffer)
}

fn attach_and_commit(display: &mut Display, surface: SurfaceId, buffer: u64) {
    display.surface_attach(surface, Some(BufferHandle(buffer)), 0, 0);
    display.surface_commit(surface);
}

#[test]
fn synchronized_commits_batch_behind_the_parent() {
    let mut f = fixture();
    let d = &mut f.display;

    // two child commits pile up without becoming observable
    d.surface_attach(f.child, Some(BufferHandle(1)), 0, 0);
    let first_frame = d.surface_frame(f.child).unwrap();
    d.surface_commit(f.child);
    d.surface_attach(f.child, Some(BufferHandle(2)), 0, 0);
    let second_frame = d.surface_frame(f.child).unwrap();
    d.surface_commit(f.child);
    assert_eq!(committed_buffer(d, f.child), None);

    // one parent commit applies both generations in order; only the
    // newest buffer is ever observable
    d.surface_commit(f.parent);
    assert_eq!(
        committed_buffer(d, f.child),
        Some(BufferAssignment::NewBuffer(BufferHandle(2)))
    );
    let callbacks: Vec<_> = d
        .surface_state(f.child)
        .unwrap()
        .frame_callbacks
        .clone();
    assert_eq!(callbacks, vec![first_frame, second_frame]);
}

#[test]
fn desynchronized_subsurfaces_commit_directly() {
    let mut f = fixture();
    let d = &mut f.display;

    d.subsurface_set_desync(f.child);
    attach_and_commit(d, f.child, 7);
    assert_eq!(
        committed_buffer(d, f.child),
        Some(BufferAssignment::NewBuffer(BufferHandle(7)))
    );
}

#[test]
fn switching_to_desync_flushes_the_queue() {
    let mut f = fixture();
    let d = &mut f.display;

    attach_and_commit(d, f.child, 1);
    attach_and_commit(d, f.child, 2);
    assert_eq!(committed_buffer(d, f.child), None);

    d.subsurface_set_desync(f.child);
    assert_eq!(
        committed_buffer(d, f.child),
        Some(BufferAssignment::NewBuffer(BufferHandle(2)))
    );
}

#[test]
fn effective_synchronization_is_inherited() {
    let mut f = fixture();
    let d = &mut f.display;

    // grandchild in desync mode below a synchronized child
    let grandchild = d.create_surface(f.client);
    d.get_subsurface(grandchild, f.child).unwrap();
    d.subsurface_set_desync(grandchild);
    assert!(d.surface_effectively_sync(grandchild));

    attach_and_commit(d, grandchild, 9);
    assert_eq!(committed_buffer(d, grandchild), None);

    // the whole synchronized subtree drains with the root commit
    d.surface_commit(f.parent);
    assert_eq!(
        committed_buffer(d, grandchild),
        Some(BufferAssignment::NewBuffer(BufferHandle(9)))
    );
}

#[test]
fn parenting_cycles_are_protocol_errors() {
    let mut f = fixture();
    let d = &mut f.display;

    let err = d.get_subsurface(f.parent, f.child).unwrap_err();
    assert_eq!(err.code, ErrorCode::BadSurface);

    let surface = d.create_surface(f.client);
    let err = d.get_subsurface(surface, surface).unwrap_err();
    assert_eq!(err.code, ErrorCode::BadSurface);
}

#[test]
fn surfaces_with_a_role_cannot_become_subsurfaces() {
    let mut f = fixture();
    let d = &mut f.display;

    let surface = d.create_surface(f.client);
    d.surface_set_role(surface, "toplevel").unwrap();
    let err = d.get_subsurface(surface, f.parent).unwrap_err();
    assert_eq!(err.code, ErrorCode::Role);

    // the same surface cannot take the role twice either
    let err = d.get_subsurface(f.child, f.parent).unwrap_err();
    assert_eq!(err.code, ErrorCode::Role);
}

#[test]
fn positions_apply_on_the_parent_commit() {
    let mut f = fixture();
    let d = &mut f.display;

    d.subsurface_set_position(f.child, (40, 30).into());
    assert_eq!(d.subsurface_position(f.child), Some((0, 0).into()));

    d.surface_commit(f.child);
    assert_eq!(d.subsurface_position(f.child), Some((0, 0).into()));

    d.surface_commit(f.parent);
    assert_eq!(d.subsurface_position(f.child), Some((40, 30).into()));
}

#[test]
fn restacking_applies_on_the_parent_commit() {
    let mut f = fixture();
    let d = &mut f.display;

    let sibling = d.create_surface(f.client);
    d.get_subsurface(sibling, f.parent).unwrap();
    d.surface_commit(f.parent);
    assert_eq!(d.surface_stack(f.parent), vec![f.parent, f.child, sibling]);

    d.subsurface_place_below(sibling, f.parent).unwrap();
    assert_eq!(d.surface_stack(f.parent), vec![f.parent, f.child, sibling]);

    d.surface_commit(f.parent);
    assert_eq!(d.surface_stack(f.parent), vec![sibling, f.parent, f.child]);
}

#[test]
fn restacking_against_a_stranger_fails() {
    let mut f = fixture();
    let d = &mut f.display;

    let stranger = d.create_surface(f.client);
    let err = d.subsurface_place_above(f.child, stranger).unwrap_err();
    assert_eq!(err.code, ErrorCode::BadSurface);
}

#[test]
fn destroying_the_subsurface_frees_the_role() {
    let mut f = fixture();
    let d = &mut f.display;

    d.destroy_subsurface(f.child);
    assert!(d.surface_alive(f.child));
    assert_eq!(d.surface_role(f.child), None);
    assert_eq!(d.surface_parent(f.child), None);

    // the surface may take a role again
    d.get_subsurface(f.child, f.parent).unwrap();
}

#[test]
fn a_destroyed_parent_orphans_its_children() {
    let mut f = fixture();
    let d = &mut f.display;

    attach_and_commit(d, f.child, 1);
    assert_eq!(committed_buffer(d, f.child), None);

    d.destroy_surface(f.parent);
    assert!(d.surface_alive(f.child));
    assert_eq!(d.surface_parent(f.child), None);

    // the orphan behaves like a root surface now
    assert!(!d.surface_effectively_sync(f.child));
    attach_and_commit(d, f.child, 2);
    assert_eq!(
        committed_buffer(d, f.child),
        Some(BufferAssignment::NewBuffer(BufferHandle(2)))
    );
}

#[test]
fn damage_accumulates_across_queued_generations() {
    let mut f = fixture();
    let d = &mut f.display;

    d.surface_damage(f.child, keelson::utils::Rectangle::from_loc_and_size((0, 0), (10, 10)));
    d.surface_commit(f.child);
    d.surface_damage(f.child, keelson::utils::Rectangle::from_loc_and_size((10, 10), (10, 10)));
    d.surface_commit(f.child);

    d.surface_commit(f.parent);
    let damage = d.take_surface_damage(f.child);
    assert_eq!(damage.len(), 2);
    assert!(d.take_surface_damage(f.child).is_empty());
}
