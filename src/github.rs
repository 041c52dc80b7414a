use std::fmt;

use serde::{
    de::{value::MapAccessDeserializer, MapAccess, Visitor},
    Deserialize, Deserializer,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub id: String,
    pub message: String,
    pub url: String,
    pub committer: Committer,
}

/// Push event as sent by the hosting service. Only `commits` is mandatory;
/// absence is reported by the handler rather than by deserialization.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub reference: Option<String>,
    pub commits: Option<Vec<Commit>>,
}

#[derive(Deserialize)]
struct PushEventFields {
    #[serde(rename = "ref")]
    reference: Option<String>,
    commits: Option<Vec<Commit>>,
}

// Derived struct impls also accept sequences in field order; an event must be
// an object.
impl<'de> Deserialize<'de> for PushEvent {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EventVisitor;

        impl<'de> Visitor<'de> for EventVisitor {
            type Value = PushEvent;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a push event object")
            }

            fn visit_map<A>(self, map: A) -> Result<PushEvent, A::Error>
            where
                A: MapAccess<'de>,
            {
                let PushEventFields { reference, commits } =
                    PushEventFields::deserialize(MapAccessDeserializer::new(map))?;
                Ok(PushEvent { reference, commits })
            }
        }

        de.deserialize_map(EventVisitor)
    }
}

impl PushEvent {
    /// `master` itself or any ref path ending in `/master`.
    pub fn is_master(&self) -> bool {
        self.reference
            .as_deref()
            .map_or(false, |r| r == "master" || r.ends_with("/master"))
    }
}
