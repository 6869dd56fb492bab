use anyhow::Result;
use tracing::info;

use crate::Database;
use crate::models::{NewClub, NewEvent, NewOffer, NewSector};

const SECTORS: &[(&str, &str, &str)] = &[
    ("Informatique", "#3B82F6", "laptop"),
    ("Santé", "#10B981", "heart-pulse"),
    ("Commerce", "#F59E0B", "briefcase"),
    ("Ingénierie", "#8B5CF6", "cog"),
];

/// Populates an empty database with a small demo catalogue. Does nothing when
/// sectors already exist.
pub fn seed_demo(db: &Database) -> Result<()> {
    let existing: i64 = db.with_conn(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM sectors", [], |r| r.get(0))?)
    })?;
    if existing > 0 {
        info!("Demo seed skipped ({} sectors present)", existing);
        return Ok(());
    }

    let mut sector_ids = Vec::with_capacity(SECTORS.len());
    for (name, color, icon) in SECTORS {
        sector_ids.push(db.insert_sector(&NewSector {
            name: (*name).to_string(),
            description: None,
            color: Some((*color).to_string()),
            icon: Some((*icon).to_string()),
        })?);
    }

    let cities = ["Tunis", "Sfax", "Sousse", "Monastir", "Bizerte"];
    for (i, city) in cities.iter().cycle().take(15).enumerate() {
        let sector = sector_ids.get(i % sector_ids.len()).cloned();
        db.insert_offer(&NewOffer {
            title: format!("Stage développeur #{}", i + 1),
            kind: "stage".into(),
            location: (*city).to_string(),
            description: "Stage de fin d'études".into(),
            company_name: Some("Orange Tunisie".into()),
            duration: Some("6 mois".into()),
            sector_id: sector.clone(),
            is_active: true,
            ..Default::default()
        })?;
        db.insert_offer(&NewOffer {
            title: format!("Job étudiant #{}", i + 1),
            kind: "job".into(),
            location: (*city).to_string(),
            contract_type: Some((if i % 2 == 0 { "temps_partiel" } else { "cdd" }).into()),
            salary_range: Some("600-900 DT".into()),
            sector_id: sector,
            is_active: true,
            ..Default::default()
        })?;
        db.insert_offer(&NewOffer {
            title: format!("Logement #{}", i + 1),
            kind: "logement".into(),
            location: (*city).to_string(),
            housing_type: Some(["studio", "chambre", "colocation"][i % 3].into()),
            rent_price: Some(250 + 50 * i64::try_from(i).unwrap_or(0)),
            surface_area: Some(18 + 4 * i64::try_from(i).unwrap_or(0)),
            furnished: Some(i % 2 == 0),
            is_active: true,
            ..Default::default()
        })?;
    }

    for (i, kind) in ["salon", "jpo", "conference", "atelier"].iter().cycle().take(12).enumerate() {
        let day = i + 1;
        db.insert_event(&NewEvent {
            title: format!("Événement {}", day),
            kind: (*kind).to_string(),
            location: Some(cities[i % cities.len()].to_string()),
            organizer: Some((if i % 2 == 0 { "Université de Tunis" } else { "ANETI" }).into()),
            date_start: format!("2025-05-{day:02}T09:00:00.000Z"),
            date_end: Some(format!("2025-05-{:02}T17:00:00.000Z", day + 2)),
            ..Default::default()
        })?;
    }

    for (name, campus) in [("Club Robotique", "INSAT"), ("Enactus", "IHEC"), ("Club Théâtre", "FLSH")] {
        db.insert_club(&NewClub {
            name: name.into(),
            campus: campus.into(),
            kind: "associatif".into(),
            ..Default::default()
        })?;
    }

    info!("Demo catalogue seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_types::query::{ListQuery, Table};

    #[test]
    fn seeds_once() {
        let db = Database::open_in_memory().unwrap();
        seed_demo(&db).unwrap();
        seed_demo(&db).unwrap();

        let sectors = db.list(&ListQuery::new(Table::Sectors)).unwrap();
        assert_eq!(sectors.total, 4);
        let offers = db.list(&ListQuery::new(Table::Offers).eq("type", "logement")).unwrap();
        assert_eq!(offers.total, 15);
    }
}
