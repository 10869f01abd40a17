//! Translating an accepted configuration into worker messages

use sublink_protocol::{Body, CommandConfig, Endpoint, Message, Tag};

/// Static vehicle endpoints for each link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEndpoints {
    pub video: Endpoint,
    pub logging: Endpoint,
    pub telemetry: Endpoint,
    pub pilot: Endpoint,
}

impl LinkEndpoints {
    pub fn get(&self, tag: Tag) -> Option<&Endpoint> {
        match tag {
            Tag::Video => Some(&self.video),
            Tag::Logging => Some(&self.logging),
            Tag::Telemetry => Some(&self.telemetry),
            Tag::Pilot => Some(&self.pilot),
            Tag::Gui | Tag::Main => None,
        }
    }
}

/// Whether `config` turns on the link named by `tag`
pub fn link_enabled(config: &CommandConfig, tag: Tag) -> bool {
    match tag {
        Tag::Video => config.video_enabled,
        Tag::Logging => config.logging_enabled(),
        Tag::Telemetry => config.telemetry_enabled,
        Tag::Pilot => config.pilot_enabled,
        Tag::Gui | Tag::Main => false,
    }
}

/// Messages that bring up exactly the links `config` enables
///
/// One `initialize` per enabled link, followed by the logging level for the
/// logging link when it is on.
pub fn activation_plan(
    config: &CommandConfig,
    endpoints: &LinkEndpoints,
    source: Tag,
) -> Vec<Message> {
    let mut plan = Vec::new();

    for tag in Tag::LINKS {
        if !link_enabled(config, tag) {
            continue;
        }
        if let Some(endpoint) = endpoints.get(tag) {
            plan.push(Message::new(tag, source, Body::Initialize(endpoint.clone())));
        }
        if tag == Tag::Logging {
            plan.push(Message::new(tag, source, Body::Modify(config.logging_level)));
        }
    }

    plan
}
