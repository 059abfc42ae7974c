use serde::{Deserialize, Serialize};

/// A capability granting the right to issue commands to one match.
///
/// Tickets are 128 random bits. On the wire they travel as hex strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Ticket(u128);

impl Ticket {
    pub fn generate() -> Self {
        Ticket(rand::random())
    }
}

// Only a prefix is shown, so that logs don't leak usable tickets.
impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ticket({:08x}..)", self.0 >> 96)
    }
}

impl From<Ticket> for String {
    fn from(ticket: Ticket) -> String {
        format!("{:032x}", ticket.0)
    }
}

impl TryFrom<String> for Ticket {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        u128::from_str_radix(&value, 16).map(Ticket)
    }
}
