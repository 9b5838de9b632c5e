use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Each entity gets its own type so an order id can never be passed where
/// an article id is expected.
macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(
    /// Identifier of an inventory article.
    ArticleId
);
typed_id!(
    /// Identifier of a customer.
    ClientId
);
typed_id!(
    /// Identifier of a delivery location.
    LocationId
);
typed_id!(
    /// Identifier of a delivery-fee snapshot.
    FeeId
);
typed_id!(
    /// Identifier of a sales-channel configuration record.
    ConfigurationId
);
typed_id!(
    /// Identifier of a sales channel (page).
    PageId
);
typed_id!(
    /// Identifier of an order.
    OrderId
);
typed_id!(
    /// Identifier of an order line.
    OrderLineId
);
typed_id!(
    /// Identifier of a payment record.
    PaymentId
);
typed_id!(
    /// Identifier of a delivery tracking record.
    DeliveryId
);
typed_id!(
    /// Identifier of a delivery audit event.
    DeliveryEventId
);
typed_id!(
    /// Identifier of an invoice.
    InvoiceId
);
typed_id!(
    /// Identifier of a purchase.
    PurchaseId
);
typed_id!(
    /// Identifier of a purchase line.
    PurchaseLineId
);
typed_id!(
    /// Identifier of an expense category.
    ChargeCategoryId
);
typed_id!(
    /// Identifier of an expense.
    ChargeId
);

/// Identifier of a user in the external identity system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_id_new_creates_unique_ids() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn typed_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = ArticleId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn typed_id_parses_from_str() {
        let id = DeliveryId::new();
        let parsed: DeliveryId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<DeliveryId>().is_err());
    }

    #[test]
    fn typed_id_serializes_as_plain_string() {
        let id = InvoiceId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn user_id_is_transparent() {
        let json = serde_json::to_string(&UserId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
