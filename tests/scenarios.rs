use area_clients::config::Config;
use area_clients::error::ClientError;
use area_clients::shared::Geometry;
use area_clients::wm::WindowManager;
use area_clients::wm::focus::FocusPolicy;
use area_clients::wm::hints::{SizeHintFlags, SizeHints};
use area_clients::wm::protocol::RecordingSink;
use area_clients::wm::registry::WindowProbe;

const SCREEN: Geometry = Geometry { x: 0, y: 0, width: 1280, height: 800 };

fn wm_with(config: &Config) -> WindowManager<RecordingSink> {
    WindowManager::new(RecordingSink::new(), SCREEN, config)
}

fn transient(owner: u32) -> WindowProbe {
    WindowProbe {
        transient_for: Some(owner),
        ..Default::default()
    }
}

#[test]
fn transient_raise_keeps_owner_directly_below() {
    let mut wm = wm_with(&Config::default());
    for window in [10, 11, 12] {
        wm.manage(window, Geometry::new(0, 0, 50, 50), &WindowProbe::default()).unwrap();
    }
    wm.manage(1, Geometry::new(0, 0, 100, 100), &WindowProbe::default()).unwrap();
    wm.manage(2, Geometry::new(0, 0, 100, 100), &transient(1)).unwrap();
    wm.raise(10);

    wm.raise(2);

    let order = wm.sink().last_restack().unwrap().to_vec();
    assert_eq!(order.len(), 5);
    assert_eq!(&order[order.len() - 2..], &[1, 2]);
}

#[test]
fn fixed_size_client_ignores_resize_requests() {
    let mut wm = wm_with(&Config::default());
    let probe = WindowProbe {
        size_hints: Some(SizeHints {
            flags: SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_MAX_SIZE,
            min_width: 200,
            min_height: 200,
            max_width: 200,
            max_height: 200,
            ..Default::default()
        }),
        ..Default::default()
    };
    wm.manage(1, Geometry::new(0, 0, 200, 200), &probe).unwrap();

    wm.resize(1, Geometry::new(0, 0, 500, 500), true);

    assert_eq!(wm.client(1).unwrap().geometry.width, 200);
    assert_eq!(wm.client(1).unwrap().geometry.height, 200);
}

#[test]
fn nested_enterleave_suppression() {
    let mut config = Config::default();
    config.focus.policy = FocusPolicy::FocusFollowsMouse;
    let mut wm = wm_with(&config);
    wm.manage(1, Geometry::new(0, 0, 100, 100), &WindowProbe::default()).unwrap();

    wm.ignore_enterleave_events();
    wm.ignore_enterleave_events();
    wm.restore_enterleave_events();
    wm.handle_enter(1);
    assert_eq!(wm.focused(), None);

    wm.restore_enterleave_events();
    wm.handle_enter(1);
    assert_eq!(wm.focused(), Some(1));
}

#[test]
fn fullscreen_toggle_restores_geometry() {
    let mut wm = wm_with(&Config::default());
    let original = Geometry::new(40, 30, 640, 480);
    wm.manage(1, original, &WindowProbe::default()).unwrap();

    wm.set_fullscreen(1, true);
    assert_eq!(wm.client(1).unwrap().geometry, SCREEN);
    wm.set_fullscreen(1, false);

    assert_eq!(wm.client(1).unwrap().geometry, original);
}

#[test]
fn forced_transient_cycle_does_not_hang_raise() {
    let mut wm = wm_with(&Config::default());
    wm.manage(3, Geometry::new(0, 0, 10, 10), &WindowProbe::default()).unwrap();
    // Each side names the other before it exists, so nothing refuses the link
    wm.manage(1, Geometry::new(0, 0, 10, 10), &transient(2)).unwrap();
    wm.manage(2, Geometry::new(0, 0, 10, 10), &transient(1)).unwrap();

    wm.raise(2);
    wm.raise(1);

    let mut order = wm.stack().get_stacking_order().to_vec();
    assert_eq!(order.last(), Some(&1));
    order.sort_unstable();
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn registry_holds_one_client_per_window() {
    let mut wm = wm_with(&Config::default());
    let geometry = Geometry::new(0, 0, 10, 10);
    wm.manage(1, geometry, &WindowProbe::default()).unwrap();
    assert_eq!(
        wm.manage(1, geometry, &WindowProbe::default()),
        Err(ClientError::AlreadyManaged(1))
    );
    assert_eq!(wm.clients().len(), 1);

    wm.unmanage(1);
    wm.unmanage(1);
    assert!(wm.clients().is_empty());
    assert!(wm.stack().is_empty());

    wm.manage(1, geometry, &WindowProbe::default()).unwrap();
    assert_eq!(wm.clients().len(), 1);
}

#[test]
fn unmanaging_owner_orphans_transient() {
    let mut wm = wm_with(&Config::default());
    wm.manage(1, Geometry::new(0, 0, 10, 10), &WindowProbe::default()).unwrap();
    wm.manage(2, Geometry::new(0, 0, 10, 10), &transient(1)).unwrap();

    wm.unmanage(1);
    wm.raise(2);

    assert_eq!(wm.client(2).unwrap().transient_for, None);
    assert_eq!(wm.stack().get_stacking_order(), &[2]);
}
