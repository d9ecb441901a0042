use bevy::diagnostic::LogDiagnosticsPlugin;
use bevy::prelude::*;

use crate::events::{EventChannel, Subscription, Topic};
use crate::gameplay::ChannelTeardown;

pub struct DiagnosticsPlugin;

impl Plugin for DiagnosticsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(LogDiagnosticsPlugin::default())
            .add_systems(Startup, attach_event_trace)
            .add_systems(
                Last,
                release_event_trace.in_set(ChannelTeardown::ReleaseSubscribers),
            );
    }
}

/// Debug log line for every publish on every topic.
#[derive(Resource, Default)]
pub struct EventTrace {
    subscriptions: Vec<Subscription>,
}

impl EventTrace {
    pub fn attach(channel: &EventChannel) -> Self {
        let subscriptions = Topic::ALL
            .into_iter()
            .map(|topic| {
                channel.subscribe_scoped(topic, move |value| {
                    debug!(target: "dungeon_core.events", %topic, value, "published");
                })
            })
            .collect();
        Self { subscriptions }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

fn attach_event_trace(mut commands: Commands, channel: Res<EventChannel>) {
    commands.insert_resource(EventTrace::attach(&channel));
}

fn release_event_trace(mut exits: EventReader<AppExit>, trace: Option<ResMut<EventTrace>>) {
    if exits.read().last().is_none() {
        return;
    }
    if let Some(mut trace) = trace {
        trace.subscriptions.clear();
    }
}
