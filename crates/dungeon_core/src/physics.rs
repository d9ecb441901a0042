//! Axis-aligned box movement and contact reporting.

use bevy::math::Rect;
use bevy::prelude::*;

/// Gap left between bodies after separation so a resting body does not
/// report the same contact again.
const SKIN: f32 = 0.01;

#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub Vec2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyKind {
    Player,
    Enemy,
    Projectile,
    Wall,
    Chest,
}

impl BodyKind {
    pub fn is_static(self) -> bool {
        matches!(self, BodyKind::Wall | BodyKind::Chest)
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Collider {
    pub kind: BodyKind,
    pub size: Vec2,
    pub offset: Vec2,
    /// Pooled bodies sit disabled while inactive.
    pub enabled: bool,
}

impl Collider {
    pub fn new(kind: BodyKind, size: Vec2) -> Self {
        Self {
            kind,
            size,
            offset: Vec2::ZERO,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn aabb(&self, position: Vec2) -> Rect {
        Rect::from_center_size(position + self.offset, self.size)
    }
}

/// One notification per touching pair per tick. For static contacts
/// `moving` is the dynamic body; dynamic pairs are ordered by kind.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub moving: Entity,
    pub moving_kind: BodyKind,
    pub other: Entity,
    pub other_kind: BodyKind,
}

impl Contact {
    /// The pair as `(a, b)` when it joins kinds `a` and `b`, in either order.
    pub fn between(&self, a: BodyKind, b: BodyKind) -> Option<(Entity, Entity)> {
        if self.moving_kind == a && self.other_kind == b {
            Some((self.moving, self.other))
        } else if self.moving_kind == b && self.other_kind == a {
            Some((self.other, self.moving))
        } else {
            None
        }
    }
}

/// Shortest push that moves `a` out of `b`, or `None` if they do not
/// overlap. Touching edges do not count.
pub fn penetration(a: Rect, b: Rect) -> Option<Vec2> {
    let overlap = a.intersect(b);
    if overlap.is_empty() {
        return None;
    }
    let size = overlap.size();
    let away = a.center() - b.center();
    if size.x < size.y {
        let sign = if away.x < 0.0 { -1.0 } else { 1.0 };
        Some(Vec2::new(sign * (size.x + SKIN), 0.0))
    } else {
        let sign = if away.y < 0.0 { -1.0 } else { 1.0 };
        Some(Vec2::new(0.0, sign * (size.y + SKIN)))
    }
}

pub fn integrate_bodies(
    time: Res<Time>,
    mut contacts: EventWriter<Contact>,
    mut bodies: Query<(Entity, &mut Transform, &Velocity, &Collider)>,
) {
    let dt = time.delta_secs();
    let statics: Vec<(Entity, BodyKind, Rect)> = bodies
        .iter()
        .filter(|(_, _, _, collider)| collider.enabled && collider.kind.is_static())
        .map(|(entity, transform, _, collider)| {
            (
                entity,
                collider.kind,
                collider.aabb(transform.translation.truncate()),
            )
        })
        .collect();

    let mut movers: Vec<(Entity, BodyKind, Rect)> = Vec::new();
    for (entity, mut transform, velocity, collider) in bodies.iter_mut() {
        if !collider.enabled || collider.kind.is_static() {
            continue;
        }
        transform.translation += velocity.0.extend(0.0) * dt;
        for (other, other_kind, rect) in &statics {
            let aabb = collider.aabb(transform.translation.truncate());
            let Some(push) = penetration(aabb, *rect) else {
                continue;
            };
            if collider.kind != BodyKind::Projectile {
                transform.translation += push.extend(0.0);
            }
            contacts.send(Contact {
                moving: entity,
                moving_kind: collider.kind,
                other: *other,
                other_kind: *other_kind,
            });
        }
        movers.push((
            entity,
            collider.kind,
            collider.aabb(transform.translation.truncate()),
        ));
    }

    movers.sort_by_key(|(entity, kind, _)| (*kind, *entity));
    for (idx, (a, a_kind, a_rect)) in movers.iter().enumerate() {
        for (b, b_kind, b_rect) in &movers[idx + 1..] {
            if a_rect.intersect(*b_rect).is_empty() {
                continue;
            }
            contacts.send(Contact {
                moving: *a,
                moving_kind: *a_kind,
                other: *b,
                other_kind: *b_kind,
            });
        }
    }
}
