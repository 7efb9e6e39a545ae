//! Constellation reference data, indexed by model class id.

use serde::Serialize;

pub const NO_DESCRIPTION: &str = "No description available.";
pub const NO_FACTS: &str = "No additional facts available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConstellationEntry {
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub facts: &'static str,
}

const fn entry(
    id: u32,
    name: &'static str,
    description: &'static str,
    facts: &'static str,
) -> ConstellationEntry {
    ConstellationEntry {
        id,
        name,
        description,
        facts,
    }
}

/// Ordered by class id; position in the table is the id.
pub static CATALOG: [ConstellationEntry; 16] = [
    entry(
        0,
        "Aquila",
        "Aquila, the Eagle, is a constellation on the celestial equator. Its brightest star, Altair, is one of the vertices of the Summer Triangle asterism.",
        "• Contains Altair\n• Part of Summer Triangle\n• Visible June-November",
    ),
    entry(
        1,
        "Bootes",
        "Bootes is a constellation in the northern sky, containing the bright star Arcturus, the fourth-brightest star in the night sky.",
        "• Home to Arcturus\n• Visible March-September\n• Name means 'plowman'",
    ),
    entry(
        2,
        "Canis Major",
        "Canis Major, the Greater Dog, contains Sirius, the brightest star in the night sky. It represents one of Orion's hunting dogs.",
        "• Contains Sirius\n• Follows Orion\n• Best visible in winter",
    ),
    entry(
        3,
        "Canis Minor",
        "Canis Minor, the Lesser Dog, contains Procyon, forming one vertex of the Winter Triangle asterism.",
        "• Contains Procyon\n• Forms Winter Triangle\n• Small constellation",
    ),
    entry(
        4,
        "Cassiopeia",
        "Cassiopeia is easily recognizable due to its distinctive 'W' or 'M' shape formed by five bright stars.",
        "• Circumpolar constellation\n• Distinctive 'W' shape\n• Named after a queen",
    ),
    entry(
        5,
        "Cygnus",
        "Cygnus, the Swan, contains Deneb and forms the Northern Cross asterism.",
        "• Northern Cross\n• Contains Deneb\n• Located in Milky Way",
    ),
    entry(
        6,
        "Gemini",
        "Gemini, the Twins, contains the bright stars Castor and Pollux, named after twin brothers in Greek mythology.",
        "• Third zodiac sign\n• Twins Castor & Pollux\n• Best in Jan-Feb",
    ),
    entry(
        7,
        "Leo",
        "Leo, the Lion, contains Regulus and is easily identified by its distinctive sickle-shaped asterism.",
        "• Fifth zodiac sign\n• Contains Regulus\n• Best visible in spring",
    ),
    entry(
        8,
        "Lyra",
        "Lyra represents Orpheus's lyre and contains Vega, one of the brightest stars visible from Earth.",
        "• Contains Vega\n• Home to Ring Nebula\n• Orpheus's lyre",
    ),
    entry(
        9,
        "Moon",
        "The Moon is Earth's only natural satellite and the brightest object in the night sky after the Sun.",
        "• 384,400 km from Earth\n• Diameter: 3,474 km\n• Only visited celestial body",
    ),
    entry(
        10,
        "Orion",
        "Orion is one of the most recognizable constellations, containing Betelgeuse, Rigel, and the famous Orion's Belt.",
        "• Most recognizable\n• Contains Orion Nebula\n• Best in winter",
    ),
    entry(
        11,
        "Pleiades",
        "The Pleiades, also known as the Seven Sisters, is an open star cluster in Taurus, one of the nearest to Earth.",
        "• Seven Sisters\n• 444 light-years away\n• Over 1,000 stars",
    ),
    entry(
        12,
        "Sagittarius",
        "Sagittarius contains the center of our Milky Way galaxy and is represented as a centaur drawing a bow.",
        "• Points to galactic center\n• Ninth zodiac sign\n• Best in summer",
    ),
    entry(
        13,
        "Scorpius",
        "Scorpius contains the red supergiant Antares and has a distinctive J-shaped pattern representing a scorpion.",
        "• Contains Antares\n• Zodiac constellation\n• Best in summer",
    ),
    entry(
        14,
        "Taurus",
        "Taurus contains Aldebaran and two famous star clusters: the Pleiades and the Hyades.",
        "• Second zodiac sign\n• Contains Pleiades\n• Best in winter",
    ),
    entry(
        15,
        "Ursa Major",
        "Ursa Major, the Great Bear, contains the Big Dipper asterism, useful for navigation.",
        "• Third largest\n• Contains Big Dipper\n• Visible year-round",
    ),
];

pub fn entries() -> &'static [ConstellationEntry] {
    &CATALOG
}

pub fn len() -> usize {
    CATALOG.len()
}

pub fn names() -> Vec<&'static str> {
    CATALOG.iter().map(|e| e.name).collect()
}

pub fn by_id(id: u32) -> Option<&'static ConstellationEntry> {
    CATALOG.get(id as usize)
}

/// Exact, case-sensitive match on the canonical name.
pub fn by_name(name: &str) -> Option<&'static ConstellationEntry> {
    CATALOG.iter().find(|e| e.name == name)
}

/// Case-insensitive lookup used by the public API.
pub fn lookup(name: &str) -> Option<&'static ConstellationEntry> {
    let wanted = name.to_lowercase();
    CATALOG.iter().find(|e| e.name.to_lowercase() == wanted)
}

/// Display label for a model class id; ids outside the table become
/// `Unknown_<id>`.
pub fn label_for(class_id: u32) -> String {
    match by_id(class_id) {
        Some(entry) => entry.name.to_string(),
        None => format!("Unknown_{}", class_id),
    }
}

pub fn description_for(label: &str) -> &'static str {
    by_name(label).map_or(NO_DESCRIPTION, |e| e.description)
}

pub fn facts_for(label: &str) -> &'static str {
    by_name(label).map_or(NO_FACTS, |e| e.facts)
}

/// Checks the table invariants: ids contiguous from 0, names unique
/// ignoring case.
pub fn validate() -> anyhow::Result<()> {
    for (position, entry) in CATALOG.iter().enumerate() {
        if entry.id as usize != position {
            anyhow::bail!(
                "catalog entry {} has id {}, expected {}",
                entry.name,
                entry.id,
                position
            );
        }
        let clashes = CATALOG
            .iter()
            .filter(|other| other.name.eq_ignore_ascii_case(entry.name))
            .count();
        if clashes > 1 {
            anyhow::bail!("catalog name {} is not unique", entry.name);
        }
    }
    Ok(())
}
