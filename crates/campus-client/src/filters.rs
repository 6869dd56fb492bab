//! Filter criteria per listing page and their translation into read queries.
//! Empty text and `None` always mean "no constraint".

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use campus_types::models::{
    Career, ContractType, EducationLevel, Event, EventKind, Formation, HousingType, Offer,
    OfferKind, Record, Sector, StudentClub,
};
use campus_types::query::{ListQuery, Table, Value};

/// Counted noun for the results line of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Noun {
    pub singular: &'static str,
    /// Shown instead of a count when nothing matches.
    pub none: &'static str,
    pub feminine: bool,
}

impl Noun {
    /// "1 événement trouvé", "3 stages trouvés".
    pub fn count_label(&self, total: u64) -> String {
        match total {
            0 => self.none.to_string(),
            1 => format!("1 {} trouvé{}", self.singular, self.agreement()),
            n => format!("{n} {}s trouvé{}s", self.singular, self.agreement()),
        }
    }

    fn agreement(&self) -> &'static str {
        if self.feminine { "e" } else { "" }
    }
}

/// A listing page's filter struct.
pub trait ListFilters: Clone + Default + PartialEq + Send + Sync + 'static {
    type Record: Record;
    /// Partial update merged field by field.
    type Patch: Send + 'static;

    fn merge(&mut self, patch: Self::Patch);

    /// Predicates and ordering, without the page window.
    fn to_query(&self) -> ListQuery;

    /// True when at least one field constrains the listing.
    fn is_active(&self) -> bool;

    fn noun(&self) -> Noun;

    /// Every constraint removed. Listings that are split by kind keep it.
    fn cleared(&self) -> Self {
        Self::default()
    }
}

fn trimmed(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

fn with_ilike(query: ListQuery, column: &str, text: &str) -> ListQuery {
    match trimmed(text) {
        Some(needle) => query.ilike(column, needle),
        None => query,
    }
}

// -- Offers --

/// Offer criteria, one field set per tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferFilters {
    Internship {
        location: String,
        sector: Option<Uuid>,
    },
    Job {
        location: String,
        sector: Option<Uuid>,
        contract_type: Option<ContractType>,
    },
    Housing {
        location: String,
        housing_type: Option<HousingType>,
        /// Inclusive monthly rent bounds.
        rent_range: Option<(i64, i64)>,
        furnished: Option<bool>,
    },
}

impl Default for OfferFilters {
    fn default() -> Self {
        Self::new(OfferKind::Internship)
    }
}

/// `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferFilterPatch {
    pub location: Option<String>,
    pub sector: Option<Option<Uuid>>,
    pub contract_type: Option<Option<ContractType>>,
    pub housing_type: Option<Option<HousingType>>,
    pub rent_range: Option<Option<(i64, i64)>>,
    pub furnished: Option<Option<bool>>,
}

impl OfferFilters {
    pub fn new(kind: OfferKind) -> Self {
        Self::with_location(kind, String::new())
    }

    fn with_location(kind: OfferKind, location: String) -> Self {
        match kind {
            OfferKind::Internship => OfferFilters::Internship { location, sector: None },
            OfferKind::Job => OfferFilters::Job {
                location,
                sector: None,
                contract_type: None,
            },
            OfferKind::Housing => OfferFilters::Housing {
                location,
                housing_type: None,
                rent_range: None,
                furnished: None,
            },
        }
    }

    pub fn kind(&self) -> OfferKind {
        match self {
            OfferFilters::Internship { .. } => OfferKind::Internship,
            OfferFilters::Job { .. } => OfferKind::Job,
            OfferFilters::Housing { .. } => OfferKind::Housing,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            OfferFilters::Internship { location, .. }
            | OfferFilters::Job { location, .. }
            | OfferFilters::Housing { location, .. } => location,
        }
    }

    /// Moves to another tab. The location carries over, the rest resets.
    pub fn switch_kind(&mut self, kind: OfferKind) {
        if self.kind() == kind {
            return;
        }
        let location = std::mem::take(match self {
            OfferFilters::Internship { location, .. }
            | OfferFilters::Job { location, .. }
            | OfferFilters::Housing { location, .. } => location,
        });
        *self = Self::with_location(kind, location);
    }
}

impl ListFilters for OfferFilters {
    type Record = Offer;
    type Patch = OfferFilterPatch;

    /// Fields that do not exist on the current tab are ignored.
    fn merge(&mut self, patch: OfferFilterPatch) {
        match self {
            OfferFilters::Internship { location, sector } => {
                if let Some(l) = patch.location {
                    *location = l;
                }
                if let Some(s) = patch.sector {
                    *sector = s;
                }
            }
            OfferFilters::Job {
                location,
                sector,
                contract_type,
            } => {
                if let Some(l) = patch.location {
                    *location = l;
                }
                if let Some(s) = patch.sector {
                    *sector = s;
                }
                if let Some(c) = patch.contract_type {
                    *contract_type = c;
                }
            }
            OfferFilters::Housing {
                location,
                housing_type,
                rent_range,
                furnished,
            } => {
                if let Some(l) = patch.location {
                    *location = l;
                }
                if let Some(h) = patch.housing_type {
                    *housing_type = h;
                }
                if let Some(r) = patch.rent_range {
                    *rent_range = r;
                }
                if let Some(f) = patch.furnished {
                    *furnished = f;
                }
            }
        }
    }

    fn to_query(&self) -> ListQuery {
        let mut query = ListQuery::new(Table::Offers)
            .eq("type", self.kind().as_str())
            .eq("is_active", true);
        query = with_ilike(query, "location", self.location());

        match self {
            OfferFilters::Internship { sector, .. } => {
                if let Some(sector) = sector {
                    query = query.eq("sector_id", sector.to_string());
                }
            }
            OfferFilters::Job {
                sector,
                contract_type,
                ..
            } => {
                if let Some(sector) = sector {
                    query = query.eq("sector_id", sector.to_string());
                }
                if let Some(contract) = contract_type {
                    query = query.eq("contract_type", contract.as_str());
                }
            }
            OfferFilters::Housing {
                housing_type,
                rent_range,
                furnished,
                ..
            } => {
                if let Some(housing) = housing_type {
                    query = query.eq("housing_type", housing.as_str());
                }
                if let Some((a, b)) = *rent_range {
                    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                    query = query.range("rent_price", Some(Value::Int(lo)), Some(Value::Int(hi)));
                }
                if let Some(furnished) = *furnished {
                    query = query.eq("furnished", furnished);
                }
            }
        }

        query.order_by(Offer::default_order())
    }

    fn is_active(&self) -> bool {
        trimmed(self.location()).is_some()
            || match self {
                OfferFilters::Internship { sector, .. } => sector.is_some(),
                OfferFilters::Job {
                    sector,
                    contract_type,
                    ..
                } => sector.is_some() || contract_type.is_some(),
                OfferFilters::Housing {
                    housing_type,
                    rent_range,
                    furnished,
                    ..
                } => housing_type.is_some() || rent_range.is_some() || furnished.is_some(),
            }
    }

    fn noun(&self) -> Noun {
        Noun {
            singular: self.kind().noun(),
            none: "Aucune offre trouvée",
            feminine: false,
        }
    }

    fn cleared(&self) -> Self {
        Self::new(self.kind())
    }
}

// -- Events --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilters {
    pub kind: EventKind,
    pub location: String,
    /// Inclusive calendar days, either side open.
    pub date_range: (Option<NaiveDate>, Option<NaiveDate>),
    pub organizer: String,
}

impl Default for EventFilters {
    fn default() -> Self {
        Self::new(EventKind::Fair)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilterPatch {
    pub kind: Option<EventKind>,
    pub location: Option<String>,
    pub date_range: Option<(Option<NaiveDate>, Option<NaiveDate>)>,
    pub organizer: Option<String>,
}

impl EventFilters {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            location: String::new(),
            date_range: (None, None),
            organizer: String::new(),
        }
    }
}

/// Same text layout as stored timestamps, so bounds compare correctly.
fn timestamp_text(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub(crate) fn start_of_day(day: NaiveDate) -> String {
    timestamp_text(day.and_time(NaiveTime::MIN))
}

/// 23:59:59.999 of `day`.
pub(crate) fn end_of_day(day: NaiveDate) -> String {
    timestamp_text(day.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1))
}

impl ListFilters for EventFilters {
    type Record = Event;
    type Patch = EventFilterPatch;

    fn merge(&mut self, patch: EventFilterPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(range) = patch.date_range {
            self.date_range = range;
        }
        if let Some(organizer) = patch.organizer {
            self.organizer = organizer;
        }
    }

    fn to_query(&self) -> ListQuery {
        let mut query = ListQuery::new(Table::Events).eq("type", self.kind.as_str());
        query = with_ilike(query, "location", &self.location);
        query = with_ilike(query, "organizer", &self.organizer);

        let (from, to) = self.date_range;
        query = query.range(
            "date_start",
            from.map(|d| Value::Text(start_of_day(d))),
            to.map(|d| Value::Text(end_of_day(d))),
        );

        query.order_by(Event::default_order())
    }

    fn is_active(&self) -> bool {
        trimmed(&self.location).is_some()
            || trimmed(&self.organizer).is_some()
            || self.date_range.0.is_some()
            || self.date_range.1.is_some()
    }

    fn noun(&self) -> Noun {
        Noun {
            singular: "événement",
            none: "Aucun événement trouvé",
            feminine: false,
        }
    }

    fn cleared(&self) -> Self {
        Self::new(self.kind)
    }
}

// -- Sectors --

/// Sector list feeding the filter bar's sector picker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorFilters {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorFilterPatch {
    pub name: Option<String>,
}

impl ListFilters for SectorFilters {
    type Record = Sector;
    type Patch = SectorFilterPatch;

    fn merge(&mut self, patch: SectorFilterPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
    }

    fn to_query(&self) -> ListQuery {
        with_ilike(ListQuery::new(Table::Sectors), "name", &self.name).order_by(Sector::default_order())
    }

    fn is_active(&self) -> bool {
        trimmed(&self.name).is_some()
    }

    fn noun(&self) -> Noun {
        Noun {
            singular: "secteur",
            none: "Aucun secteur trouvé",
            feminine: false,
        }
    }
}

fn with_sector(query: ListQuery, sector: Option<Uuid>) -> ListQuery {
    match sector {
        Some(sector) => query.eq("sector_id", sector.to_string()),
        None => query,
    }
}

// -- Careers and formations --

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CareerFilters {
    pub sector: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CareerFilterPatch {
    pub sector: Option<Option<Uuid>>,
}

impl ListFilters for CareerFilters {
    type Record = Career;
    type Patch = CareerFilterPatch;

    fn merge(&mut self, patch: CareerFilterPatch) {
        if let Some(sector) = patch.sector {
            self.sector = sector;
        }
    }

    fn to_query(&self) -> ListQuery {
        with_sector(ListQuery::new(Table::Careers), self.sector).order_by(Career::default_order())
    }

    fn is_active(&self) -> bool {
        self.sector.is_some()
    }

    fn noun(&self) -> Noun {
        Noun {
            singular: "métier",
            none: "Aucun métier trouvé",
            feminine: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormationFilters {
    pub sector: Option<Uuid>,
    pub level: Option<EducationLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormationFilterPatch {
    pub sector: Option<Option<Uuid>>,
    pub level: Option<Option<EducationLevel>>,
}

impl ListFilters for FormationFilters {
    type Record = Formation;
    type Patch = FormationFilterPatch;

    fn merge(&mut self, patch: FormationFilterPatch) {
        if let Some(sector) = patch.sector {
            self.sector = sector;
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
    }

    fn to_query(&self) -> ListQuery {
        let mut query = with_sector(ListQuery::new(Table::Formations), self.sector);
        if let Some(level) = self.level {
            query = query.eq("level", level.as_str());
        }
        query.order_by(Formation::default_order())
    }

    fn is_active(&self) -> bool {
        self.sector.is_some() || self.level.is_some()
    }

    fn noun(&self) -> Noun {
        Noun {
            singular: "formation",
            none: "Aucune formation trouvée",
            feminine: true,
        }
    }
}

// -- Student clubs --

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubFilters {
    pub campus: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubFilterPatch {
    pub campus: Option<String>,
    pub kind: Option<Option<String>>,
}

impl ListFilters for ClubFilters {
    type Record = StudentClub;
    type Patch = ClubFilterPatch;

    fn merge(&mut self, patch: ClubFilterPatch) {
        if let Some(campus) = patch.campus {
            self.campus = campus;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
    }

    fn to_query(&self) -> ListQuery {
        let mut query = ListQuery::new(Table::StudentClubs).eq("is_active", true);
        query = with_ilike(query, "campus", &self.campus);
        if let Some(kind) = self.kind.as_deref().and_then(trimmed) {
            query = query.eq("type", kind);
        }
        query.order_by(StudentClub::default_order())
    }

    fn is_active(&self) -> bool {
        trimmed(&self.campus).is_some() || self.kind.as_deref().and_then(trimmed).is_some()
    }

    fn noun(&self) -> Noun {
        Noun {
            singular: "club",
            none: "Aucun club trouvé",
            feminine: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_types::query::{Order, Predicate};
    use rstest::rstest;

    fn columns(query: &ListQuery) -> Vec<&str> {
        query.predicates.iter().map(Predicate::column).collect()
    }

    #[rstest]
    #[case::internship(OfferKind::Internship)]
    #[case::job(OfferKind::Job)]
    #[case::housing(OfferKind::Housing)]
    fn empty_offer_filters_only_pin_kind(#[case] kind: OfferKind) {
        let filters = OfferFilters::new(kind);
        let query = filters.to_query();
        assert!(!filters.is_active());
        assert_eq!(columns(&query), vec!["type", "is_active"]);
        assert_eq!(query.order, Some(Order::desc("created_at")));
        query.validate().unwrap();
    }

    #[test]
    fn whitespace_location_is_no_constraint() {
        let mut filters = OfferFilters::new(OfferKind::Job);
        filters.merge(OfferFilterPatch {
            location: Some("   ".into()),
            ..Default::default()
        });
        assert!(!filters.is_active());
        assert_eq!(columns(&filters.to_query()), vec!["type", "is_active"]);
    }

    #[test]
    fn job_ignores_housing_fields() {
        let mut filters = OfferFilters::new(OfferKind::Job);
        filters.merge(OfferFilterPatch {
            location: Some("Tunis".into()),
            rent_range: Some(Some((0, 2000))),
            furnished: Some(Some(true)),
            ..Default::default()
        });

        let query = filters.to_query();
        assert_eq!(columns(&query), vec!["type", "is_active", "location"]);
        assert_eq!(
            query.predicates[2],
            Predicate::Ilike {
                column: "location".into(),
                needle: "Tunis".into()
            }
        );
    }

    #[test]
    fn housing_filters_map_to_predicates() {
        let mut filters = OfferFilters::new(OfferKind::Housing);
        filters.merge(OfferFilterPatch {
            housing_type: Some(Some(HousingType::Studio)),
            rent_range: Some(Some((900, 100))),
            furnished: Some(Some(false)),
            ..Default::default()
        });

        let query = filters.to_query();
        assert_eq!(
            columns(&query),
            vec!["type", "is_active", "housing_type", "rent_price", "furnished"]
        );
        assert_eq!(
            query.predicates[3],
            Predicate::Range {
                column: "rent_price".into(),
                min: Some(Value::Int(100)),
                max: Some(Value::Int(900)),
            }
        );
        assert_eq!(
            query.predicates[4],
            Predicate::Eq {
                column: "furnished".into(),
                value: Value::Bool(false)
            }
        );
        query.validate().unwrap();
    }

    #[test]
    fn clearing_a_field_drops_its_predicate() {
        let sector = Uuid::new_v4();
        let mut filters = OfferFilters::new(OfferKind::Internship);
        filters.merge(OfferFilterPatch {
            sector: Some(Some(sector)),
            ..Default::default()
        });
        assert!(columns(&filters.to_query()).contains(&"sector_id"));

        filters.merge(OfferFilterPatch {
            sector: Some(None),
            ..Default::default()
        });
        assert!(!columns(&filters.to_query()).contains(&"sector_id"));
    }

    #[test]
    fn switching_tab_keeps_location_only() {
        let mut filters = OfferFilters::new(OfferKind::Job);
        filters.merge(OfferFilterPatch {
            location: Some("Sfax".into()),
            contract_type: Some(Some(ContractType::Cdi)),
            ..Default::default()
        });

        filters.switch_kind(OfferKind::Housing);
        assert_eq!(
            filters,
            OfferFilters::Housing {
                location: "Sfax".into(),
                housing_type: None,
                rent_range: None,
                furnished: None,
            }
        );
    }

    #[test]
    fn event_dates_cover_whole_days() {
        let mut filters = EventFilters::new(EventKind::OpenDay);
        filters.merge(EventFilterPatch {
            date_range: Some((NaiveDate::from_ymd_opt(2024, 5, 1), NaiveDate::from_ymd_opt(2024, 5, 3))),
            organizer: Some("ANETI".into()),
            ..Default::default()
        });

        let query = filters.to_query();
        assert_eq!(columns(&query), vec!["type", "organizer", "date_start"]);
        assert_eq!(
            query.predicates[2],
            Predicate::Range {
                column: "date_start".into(),
                min: Some(Value::Text("2024-05-01T00:00:00.000Z".into())),
                max: Some(Value::Text("2024-05-03T23:59:59.999Z".into())),
            }
        );
        assert_eq!(query.order, Some(Order::asc("date_start")));
    }

    #[test]
    fn open_ended_date_range() {
        let mut filters = EventFilters::default();
        filters.merge(EventFilterPatch {
            date_range: Some((None, NaiveDate::from_ymd_opt(2024, 12, 31))),
            ..Default::default()
        });
        assert!(filters.is_active());
        assert_eq!(
            filters.to_query().predicates[1],
            Predicate::Range {
                column: "date_start".into(),
                min: None,
                max: Some(Value::Text("2024-12-31T23:59:59.999Z".into())),
            }
        );
    }

    #[rstest]
    #[case(0, "Aucune offre trouvée")]
    #[case(1, "1 stage trouvé")]
    #[case(3, "3 stages trouvés")]
    fn offer_count_labels(#[case] total: u64, #[case] expected: &str) {
        assert_eq!(OfferFilters::default().noun().count_label(total), expected);
    }

    #[test]
    fn event_count_label() {
        assert_eq!(EventFilters::default().noun().count_label(1), "1 événement trouvé");
        assert_eq!(EventFilters::default().noun().count_label(0), "Aucun événement trouvé");
    }

    #[rstest]
    #[case::everything(None, vec![])]
    #[case::one_sector(Some(Uuid::nil()), vec!["sector_id"])]
    fn career_filters_by_sector(#[case] sector: Option<Uuid>, #[case] expected: Vec<&str>) {
        let query = CareerFilters { sector }.to_query();
        assert_eq!(columns(&query), expected);
        assert_eq!(query.order, Some(Order::asc("title")));
        query.validate().unwrap();
    }

    #[rstest]
    #[case::everything(None, None, vec![])]
    #[case::sector_only(Some(Uuid::nil()), None, vec!["sector_id"])]
    #[case::level_only(None, Some(EducationLevel::Master), vec!["level"])]
    #[case::both(Some(Uuid::nil()), Some(EducationLevel::Licence), vec!["sector_id", "level"])]
    fn formation_filters_by_sector_and_level(
        #[case] sector: Option<Uuid>,
        #[case] level: Option<EducationLevel>,
        #[case] expected: Vec<&str>,
    ) {
        let filters = FormationFilters { sector, level };
        let query = filters.to_query();
        assert_eq!(columns(&query), expected);
        assert_eq!(filters.is_active(), !expected.is_empty());
        assert_eq!(query.order, Some(Order::asc("title")));
        query.validate().unwrap();
    }

    #[test]
    fn formation_level_is_clearable() {
        let mut filters = FormationFilters::default();
        filters.merge(FormationFilterPatch {
            level: Some(Some(EducationLevel::Doctorat)),
            ..Default::default()
        });
        assert!(filters.to_query().predicates.contains(&Predicate::Eq {
            column: "level".into(),
            value: Value::Text("doctorat".into()),
        }));
        filters.merge(FormationFilterPatch {
            level: Some(None),
            ..Default::default()
        });
        assert_eq!(filters, FormationFilters::default());
        assert_eq!(filters.noun().count_label(2), "2 formations trouvées");
    }

    #[test]
    fn club_filters_only_list_active_clubs() {
        let filters = ClubFilters {
            campus: "INSAT".into(),
            kind: Some("".into()),
        };
        let query = filters.to_query();
        assert_eq!(columns(&query), vec!["is_active", "campus"]);
        query.validate().unwrap();
    }
}
