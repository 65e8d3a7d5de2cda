use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lmsgate_auth::permissions::keys;
use lmsgate_auth::{MeResponse, PermissionKey, RoleName, RouteGuard, RouteTable, Session};

fn session(roles: &[&'static str], permissions: usize) -> Session {
    let me: MeResponse = serde_json::from_value(serde_json::json!({
        "user": { "id": 7, "first_name": "Bench", "last_name": "User", "roles": roles },
        "permissions": (0..permissions).map(|i| format!("perm_{i}")).collect::<Vec<_>>(),
    }))
    .expect("valid fixture");
    Session::from_identity(me)
}

fn bench_can(c: &mut Criterion) {
    let employee = session(&["employee"], 200);
    let admin = session(&["admin"], 0);
    let hit = PermissionKey::new("perm_150");

    c.bench_function("can/explicit_hit", |b| b.iter(|| employee.can(black_box(&hit))));
    c.bench_function("can/explicit_miss", |b| {
        b.iter(|| employee.can(black_box(&keys::ROLE_EDIT)))
    });
    c.bench_function("can/admin_bypass", |b| b.iter(|| admin.can(black_box(&keys::ROLE_EDIT))));
}

fn bench_guard(c: &mut Criterion) {
    let manager = session(&["employee", "manager"], 50);
    let guard = RouteGuard::authenticated()
        .allow_roles([RoleName::MANAGER, RoleName::ADMIN])
        .require_any_permission([keys::VIEW_TEAM, PermissionKey::new("perm_49")])
        .require_permission(PermissionKey::new("perm_10"));
    let table = RouteTable::portal();

    c.bench_function("guard/evaluate", |b| b.iter(|| guard.evaluate(black_box(&manager))));
    c.bench_function("route_table/resolve", |b| {
        b.iter(|| table.resolve(black_box("/manager/dashboard"), &manager))
    });
}

criterion_group!(benches, bench_can, bench_guard);
criterion_main!(benches);
