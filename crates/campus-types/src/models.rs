use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::{Order, Table};

/// Enumerations stored as lowercase text in the database and on the wire.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant `{0}`")]
pub struct UnknownVariant(pub String);

text_enum!(
    /// The three offer tabs of the portal.
    OfferKind {
        Internship => "stage",
        Job => "job",
        Housing => "logement",
    }
);

text_enum!(ContractType {
    Cdi => "cdi",
    Cdd => "cdd",
    PartTime => "temps_partiel",
    FullTime => "temps_plein",
    Freelance => "freelance",
    Internship => "stage",
});

text_enum!(HousingType {
    Studio => "studio",
    Room => "chambre",
    Apartment => "appartement",
    Shared => "colocation",
    Residence => "residence",
});

text_enum!(EventKind {
    Fair => "salon",
    OpenDay => "jpo",
    Conference => "conference",
    Workshop => "atelier",
});

text_enum!(
    /// What a favorite row points at. Stored in `favorites.item_type`.
    ItemType {
        Offer => "offer",
        Event => "event",
        Career => "career",
        Formation => "formation",
        Club => "club",
    }
);

text_enum!(EducationLevel {
    Bac => "bac",
    Licence => "licence",
    Master => "master",
    Doctorat => "doctorat",
    Professional => "formation_pro",
});

impl OfferKind {
    /// Singular noun used in result counts ("3 stages trouvés").
    pub fn noun(&self) -> &'static str {
        match self {
            OfferKind::Internship => "stage",
            OfferKind::Job => "job",
            OfferKind::Housing => "logement",
        }
    }
}

impl ContractType {
    pub fn label(&self) -> &'static str {
        match self {
            ContractType::Cdi => "CDI",
            ContractType::Cdd => "CDD",
            ContractType::PartTime => "Temps partiel",
            ContractType::FullTime => "Temps plein",
            ContractType::Freelance => "Freelance",
            ContractType::Internship => "Stage",
        }
    }
}

impl HousingType {
    pub fn label(&self) -> &'static str {
        match self {
            HousingType::Studio => "Studio",
            HousingType::Room => "Chambre",
            HousingType::Apartment => "Appartement",
            HousingType::Shared => "Colocation",
            HousingType::Residence => "Résidence",
        }
    }
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Fair => "Salon",
            EventKind::OpenDay => "JPO",
            EventKind::Conference => "Conférence",
            EventKind::Workshop => "Atelier",
        }
    }
}

/// A row type that can be listed through the read contract.
pub trait Record: DeserializeOwned + Send + Sync + 'static {
    const TABLE: Table;

    fn id(&self) -> Uuid;

    fn default_order() -> Order;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Sector {
    const TABLE: Table = Table::Sectors;

    fn id(&self) -> Uuid {
        self.id
    }

    fn default_order() -> Order {
        Order::asc("name")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: OfferKind,
    pub location: String,
    pub description: String,
    pub company_name: Option<String>,
    pub contract_type: Option<ContractType>,
    pub duration: Option<String>,
    pub salary_range: Option<String>,
    pub rent_price: Option<i64>,
    pub housing_type: Option<HousingType>,
    pub surface_area: Option<i64>,
    pub furnished: Option<bool>,
    pub requirements: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub sector_id: Option<Uuid>,
    /// Joined from `sectors.name`.
    pub sector_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Housing-only attributes of an offer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HousingDetails {
    pub housing_type: Option<HousingType>,
    pub rent_price: Option<i64>,
    pub surface_area: Option<i64>,
    pub furnished: bool,
}

impl Offer {
    /// Housing attributes, present only for housing offers. Stray values on
    /// other kinds are ignored.
    pub fn housing(&self) -> Option<HousingDetails> {
        if self.kind != OfferKind::Housing {
            return None;
        }
        Some(HousingDetails {
            housing_type: self.housing_type,
            rent_price: self.rent_price,
            surface_area: self.surface_area,
            furnished: self.furnished.unwrap_or(false),
        })
    }

    /// Contract type, only meaningful on job offers.
    pub fn contract(&self) -> Option<ContractType> {
        match self.kind {
            OfferKind::Job => self.contract_type,
            _ => None,
        }
    }
}

impl Record for Offer {
    const TABLE: Table = Table::Offers;

    fn id(&self) -> Uuid {
        self.id
    }

    fn default_order() -> Order {
        Order::desc("created_at")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub location: Option<String>,
    pub description: Option<String>,
    pub organizer: Option<String>,
    pub date_start: DateTime<Utc>,
    pub date_end: Option<DateTime<Utc>>,
    pub website_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// End timestamp, dropped when it precedes the start. The store does not
    /// enforce `date_end >= date_start`.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.date_end.filter(|end| *end >= self.date_start)
    }
}

impl Record for Event {
    const TABLE: Table = Table::Events;

    fn id(&self) -> Uuid {
        self.id
    }

    fn default_order() -> Order {
        Order::asc("date_start")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Career {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub sector_id: Option<Uuid>,
    pub salary_range: Option<String>,
    pub prospects: Option<String>,
    pub required_education: Option<EducationLevel>,
    pub created_at: DateTime<Utc>,
}

impl Record for Career {
    const TABLE: Table = Table::Careers;

    fn id(&self) -> Uuid {
        self.id
    }

    fn default_order() -> Order {
        Order::asc("title")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    pub id: Uuid,
    pub title: String,
    pub level: EducationLevel,
    pub university: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub cost: Option<i64>,
    pub description: Option<String>,
    pub sector_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Record for Formation {
    const TABLE: Table = Table::Formations;

    fn id(&self) -> Uuid {
        self.id
    }

    fn default_order() -> Order {
        Order::asc("title")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentClub {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub campus: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub president: Option<String>,
    pub email_contact: Option<String>,
    pub member_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for StudentClub {
    const TABLE: Table = Table::StudentClubs;

    fn id(&self) -> Uuid {
        self.id
    }

    fn default_order() -> Order {
        Order::asc("name")
    }
}

/// Composite identity of a favorite: the user is implied by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoriteKey {
    pub item_type: ItemType,
    pub item_id: Uuid,
}

impl FavoriteKey {
    pub fn new(item_type: ItemType, item_id: Uuid) -> Self {
        Self { item_type, item_id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubMembership {
    pub id: Uuid,
    pub club_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
