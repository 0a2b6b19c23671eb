//! Conversion between a typed [`Destination`] and its textual prefix
//! form on the wire.

/// The kind of a STOMP destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Queue,
    Topic,
    TempQueue,
    TempTopic,
}

impl DestinationKind {
    fn prefix(self) -> &'static str {
        match self {
            DestinationKind::Queue => "/queue/",
            DestinationKind::Topic => "/topic/",
            DestinationKind::TempQueue => "/temp-queue/",
            DestinationKind::TempTopic => "/temp-topic/",
        }
    }
}

/// A typed destination: kind plus physical name, independent of its
/// textual wire representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub kind: DestinationKind,
    pub physical_name: String,
}

impl Destination {
    pub fn new(kind: DestinationKind, physical_name: impl Into<String>) -> Self {
        Self {
            kind,
            physical_name: physical_name.into(),
        }
    }

    pub fn queue(name: impl Into<String>) -> Self {
        Self::new(DestinationKind::Queue, name)
    }

    pub fn topic(name: impl Into<String>) -> Self {
        Self::new(DestinationKind::Topic, name)
    }

    /// `convert_to_string` -- concatenate prefix + physical name.
    pub fn to_wire_string(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.physical_name)
    }

    /// `convert_to_destination` -- pick the longest matching prefix; if
    /// none matches, default to `Queue` with the whole string as the
    /// physical name. An empty input yields `None`.
    pub fn from_wire_str(s: &str) -> Option<Destination> {
        if s.is_empty() {
            return None;
        }
        // Longest-prefix-first so `/temp-queue/` isn't shadowed by a
        // hypothetical shorter match.
        const PREFIXES: &[(&str, DestinationKind)] = &[
            ("/temp-queue/", DestinationKind::TempQueue),
            ("/temp-topic/", DestinationKind::TempTopic),
            ("/queue/", DestinationKind::Queue),
            ("/topic/", DestinationKind::Topic),
        ];
        for (prefix, kind) in PREFIXES {
            if let Some(rest) = s.strip_prefix(prefix) {
                return Some(Destination::new(*kind, rest));
            }
        }
        Some(Destination::new(DestinationKind::Queue, s))
    }
}
