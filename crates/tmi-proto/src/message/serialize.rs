use std::fmt::{self, Display, Formatter};

use super::Message;

impl Display for Message {
    /// Re-encodes the positional layout the decoder reads, so decoding the
    /// output yields the same fields. Absent fields between present ones are
    /// written as empty tokens.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_ping() {
            return match self.sender.as_deref() {
                Some(token) if !token.is_empty() => write!(f, "PING {}", token),
                _ => write!(f, "PING"),
            };
        }

        if let Some(ref tags) = self.tags {
            write!(f, "{}", tags)?;
        }

        let slots: [Option<String>; 4] = [
            self.sender.as_ref().map(|s| format!(":{}", s)),
            Some(self.command.clone()).filter(|c| !c.is_empty()),
            self.recipient.clone(),
            self.body.as_ref().map(|b| format!(":{}", b)),
        ];

        let Some(last) = slots.iter().rposition(Option::is_some) else {
            return Ok(());
        };

        for (i, slot) in slots[..=last].iter().enumerate() {
            if i > 0 || self.tags.is_some() {
                write!(f, " ")?;
            }
            if let Some(token) = slot {
                write!(f, "{}", token)?;
            }
        }

        Ok(())
    }
}
