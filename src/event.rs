use std::{collections::HashMap, fmt};

use strum_macros::{Display, EnumString, EnumVariantNames};

use crate::{buffer::Position, matching::Match};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    Match,
    Save,
    Open,
    Close,
    Swap,
    #[strum(serialize = "bol")]
    BeginOfLine,
    #[strum(serialize = "eol")]
    EndOfLine,
}

/// Something that happened during a parse, borrowed from the parse state.
#[derive(Debug, Clone, Copy)]
pub enum Event<'e> {
    Match {
        scope: &'e str,
        rule: usize,
        matched: &'e Match,
    },
    Save {
        scope: &'e str,
        matched: &'e Match,
    },
    Open {
        scope: &'e str,
        depth: usize,
    },
    Close {
        scope: &'e str,
        depth: usize,
    },
    Swap {
        from: &'e str,
        to: &'e str,
    },
    BeginOfLine(Position),
    EndOfLine(Position),
}

impl<'e> Event<'e> {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Match { .. } => Channel::Match,
            Self::Save { .. } => Channel::Save,
            Self::Open { .. } => Channel::Open,
            Self::Close { .. } => Channel::Close,
            Self::Swap { .. } => Channel::Swap,
            Self::BeginOfLine(_) => Channel::BeginOfLine,
            Self::EndOfLine(_) => Channel::EndOfLine,
        }
    }
}

pub type Subscriber = Box<dyn FnMut(&Event<'_>)>;

/// Fans events out to the subscribers of each channel, in subscription order.
#[derive(Default)]
pub struct Hub {
    subscribers: HashMap<Channel, Vec<Subscriber>>,
}

impl Hub {
    pub fn subscribe<F>(&mut self, channel: Channel, f: F) -> &mut Self
    where
        F: FnMut(&Event<'_>) + 'static,
    {
        self.subscribers.entry(channel).or_default().push(Box::new(f));
        self
    }

    pub fn publish(&mut self, event: &Event<'_>) {
        if let Some(subs) = self.subscribers.get_mut(&event.channel()) {
            for f in subs.iter_mut() {
                f(event);
            }
        }
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.subscribers.get(&channel).map_or(0, Vec::len)
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let counts: HashMap<String, usize> = self
            .subscribers
            .iter()
            .map(|(c, v)| (c.to_string(), v.len()))
            .collect();
        f.debug_struct("Hub").field("subscribers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc, str::FromStr};
    use strum::VariantNames;
    use test_log::test;

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::from_str("bol").unwrap(), Channel::BeginOfLine);
        assert_eq!(Channel::from_str("save").unwrap(), Channel::Save);
        assert!(Channel::from_str("nope").is_err());
        assert_eq!(Channel::EndOfLine.to_string(), "eol");
        assert_eq!(Channel::VARIANTS.len(), 7);
    }

    #[test]
    fn test_publish() {
        let seen = Rc::new(RefCell::new(vec![]));
        let mut hub = Hub::default();
        let log = Rc::clone(&seen);
        hub.subscribe(Channel::Open, move |e| {
            if let Event::Open { scope, depth } = e {
                log.borrow_mut().push(format!("{scope}@{depth}"));
            }
        });
        hub.publish(&Event::Open { scope: "quote", depth: 1 });
        hub.publish(&Event::Close { scope: "quote", depth: 1 });
        hub.publish(&Event::BeginOfLine(Position::new(1, 0)));
        assert_eq!(*seen.borrow(), vec!["quote@1"]);
        assert_eq!(hub.subscriber_count(Channel::Open), 1);
        assert_eq!(hub.subscriber_count(Channel::Close), 0);
    }
}
