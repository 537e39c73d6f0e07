//! Static configuration: towns, datasets, map centres, year options.

use chrono::{Datelike, Local};

use crate::domain::{Dataset, YearFilter};

/// Towns covered by the dashboard (Pays-Haut lorrain and its Moselle border).
pub const TOWNS: [&str; 40] = [
    "Longwy",
    "Mont-Saint-Martin",
    "Herserange",
    "Longlaville",
    "Réhon",
    "Lexy",
    "Cosnes-et-Romain",
    "Saulnes",
    "Hussigny-Godbrange",
    "Villerupt",
    "Thil",
    "Tiercelet",
    "Haucourt-Moulaine",
    "Gorcy",
    "Cons-la-Grandville",
    "Ville-Houdlémont",
    "Tellancourt",
    "Longuyon",
    "Pierrepont",
    "Mercy-le-Bas",
    "Audun-le-Roman",
    "Crusnes",
    "Errouville",
    "Piennes",
    "Bouligny",
    "Landres",
    "Trieux",
    "Tucquegnieux",
    "Mancieulles",
    "Val de Briey",
    "Homécourt",
    "Joeuf",
    "Auboué",
    "Moutiers",
    "Valleroy",
    "Jarny",
    "Conflans-en-Jarnisy",
    "Labry",
    "Audun-le-Tiche",
    "Russange",
];

/// Towns belonging to Moselle (57); every other town is in Meurthe-et-Moselle (54).
pub const MOSELLE_TOWNS: [&str; 3] = ["Audun-le-Tiche", "Russange", "Ottange"];

pub const PRIMARY_DEPARTMENT: &str = "54";
pub const ALTERNATE_DEPARTMENT: &str = "57";

pub const DATASETS: [Dataset; 3] = [
    Dataset {
        id: "dpe03existant",
        name: "DPE Logements existants (depuis juillet 2021)",
    },
    Dataset {
        id: "dpe-v2-logements-neufs",
        name: "DPE Logements neufs (depuis juillet 2021)",
    },
    Dataset {
        id: "dpe-france",
        name: "DPE Logements (avant juillet 2021)",
    },
];

/// Map centre per town, `(latitude, longitude)`.
const TOWN_COORDS: [(&str, f64, f64); 40] = [
    ("Longwy", 49.5197, 5.7661),
    ("Mont-Saint-Martin", 49.5413, 5.7806),
    ("Herserange", 49.5192, 5.7874),
    ("Longlaville", 49.5336, 5.7997),
    ("Réhon", 49.4986, 5.7581),
    ("Lexy", 49.4997, 5.7317),
    ("Cosnes-et-Romain", 49.5197, 5.7128),
    ("Saulnes", 49.5311, 5.8236),
    ("Hussigny-Godbrange", 49.4925, 5.8664),
    ("Villerupt", 49.4678, 5.9286),
    ("Thil", 49.4736, 5.9036),
    ("Tiercelet", 49.4833, 5.8864),
    ("Haucourt-Moulaine", 49.4975, 5.8047),
    ("Gorcy", 49.5350, 5.6836),
    ("Cons-la-Grandville", 49.4797, 5.7050),
    ("Ville-Houdlémont", 49.5425, 5.6631),
    ("Tellancourt", 49.5031, 5.6381),
    ("Longuyon", 49.4433, 5.6036),
    ("Pierrepont", 49.4172, 5.7103),
    ("Mercy-le-Bas", 49.3911, 5.7500),
    ("Audun-le-Roman", 49.3692, 5.8919),
    ("Crusnes", 49.4344, 5.9117),
    ("Errouville", 49.4197, 5.8775),
    ("Piennes", 49.3108, 5.7817),
    ("Bouligny", 49.2903, 5.7461),
    ("Landres", 49.3181, 5.8047),
    ("Trieux", 49.3253, 5.9317),
    ("Tucquegnieux", 49.3097, 5.8939),
    ("Mancieulles", 49.2858, 5.8983),
    ("Val de Briey", 49.2492, 5.9394),
    ("Homécourt", 49.2225, 5.9931),
    ("Joeuf", 49.2297, 6.0125),
    ("Auboué", 49.2125, 5.9772),
    ("Moutiers", 49.2339, 5.9633),
    ("Valleroy", 49.2075, 5.9364),
    ("Jarny", 49.1594, 5.8783),
    ("Conflans-en-Jarnisy", 49.1661, 5.8553),
    ("Labry", 49.1736, 5.8786),
    ("Audun-le-Tiche", 49.4722, 5.9519),
    ("Russange", 49.4828, 5.9536),
];

/// Fallback map centre (Longwy).
pub const DEFAULT_CENTER: (f64, f64) = (49.5197, 5.7661);

/// Number of specific years offered by the year selector.
const YEAR_SPAN: i32 = 16;

/// Case-insensitive name comparison; folds accented capitals too.
fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Is `town` in Moselle? Case-insensitive exact match.
pub fn is_moselle_town(town: &str) -> bool {
    MOSELLE_TOWNS.iter().any(|t| same_name(t, town))
}

/// Department code used to filter postcodes for `town`.
pub fn department_for(town: &str) -> &'static str {
    if is_moselle_town(town) {
        ALTERNATE_DEPARTMENT
    } else {
        PRIMARY_DEPARTMENT
    }
}

pub fn find_dataset(id: &str) -> Option<&'static Dataset> {
    DATASETS.iter().find(|d| d.id == id)
}

pub fn find_town(name: &str) -> Option<&'static str> {
    TOWNS.iter().copied().find(|t| same_name(t, name))
}

/// Map centre for `town`, `(latitude, longitude)`.
pub fn town_center(town: &str) -> Option<(f64, f64)> {
    TOWN_COORDS
        .iter()
        .find(|(name, _, _)| same_name(name, town))
        .map(|&(_, lat, lon)| (lat, lon))
}

/// Year selector options: "all years" followed by the current year and the
/// fifteen before it, most recent first.
pub fn year_options() -> Vec<YearFilter> {
    year_options_from(Local::now().year())
}

pub fn year_options_from(current_year: i32) -> Vec<YearFilter> {
    let mut out = Vec::with_capacity(YEAR_SPAN as usize + 1);
    out.push(YearFilter::All);
    for offset in 0..YEAR_SPAN {
        if let Ok(year) = u16::try_from(current_year - offset) {
            out.push(YearFilter::Year(year));
        }
    }
    out
}
