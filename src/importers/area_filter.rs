use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::csv_loader::{area_key, discover_data_files, LoadError};

/// London boroughs and Greater London belt areas, in file-name form.
pub const LONDON_AREAS: &[&str] = &[
    // Inner London boroughs
    "City_of_London",
    "Camden",
    "Greenwich",
    "Hackney",
    "Hammersmith_and_Fulham",
    "Islington",
    "Kensington_and_Chelsea",
    "Lambeth",
    "Lewisham",
    "Southwark",
    "Tower_Hamlets",
    "Wandsworth",
    "Westminster",
    // Outer London boroughs
    "Barking_and_Dagenham",
    "Barnet",
    "Bexley",
    "Brent",
    "Bromley",
    "Croydon",
    "Ealing",
    "Enfield",
    "Haringey",
    "Harrow",
    "Havering",
    "Hillingdon",
    "Hounslow",
    "Kingston_upon_Thames",
    "Merton",
    "Newham",
    "Redbridge",
    "Richmond_upon_Thames",
    "Sutton",
    "Waltham_Forest",
    // Kent
    "Dartford",
    "Gravesham",
    "Swale",
    "Tunbridge_Wells",
    "Tonbridge_and_Malling",
    "Sevenoaks",
    // Surrey
    "Tandridge",
    "Elmbridge",
    "Epsom_and_Ewell",
    "Guildford",
    "Mole_Valley",
    "Reigate_and_Banstead",
    "Runnymede",
    "Spelthorne",
    "Surrey_Heath",
    "Waverley",
    "Woking",
    // Hertfordshire
    "Hertsmere",
    "Watford",
    "Three_Rivers",
    "Welwyn_Hatfield",
    "St_Albans",
    "Dacorum",
    "East_Hertfordshire",
    "North_Hertfordshire",
    "Stevenage",
    "Broxbourne",
    // Essex
    "Epping_Forest",
    "Harlow",
    "Uttlesford",
    "Brentwood",
    "Chelmsford",
    "Basildon",
    "Castle_Point",
    "Rochford",
    "Maldon",
    "Thurrock",
    // Berkshire
    "Slough",
    "Windsor_and_Maidenhead",
    "Bracknell_Forest",
    "Reading",
    "Wokingham",
    "West_Berkshire",
    // West Sussex
    "Crawley",
    "Mid_Sussex",
    "Horsham",
    // Bedfordshire / Buckinghamshire
    "Luton",
    "Milton_Keynes",
];

pub fn is_london_area(key: &str) -> bool {
    LONDON_AREAS.contains(&key)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaPartition {
    pub keep: Vec<PathBuf>,
    pub remove: Vec<PathBuf>,
}

/// Split the data files into London / Greater London belt files and the rest.
pub fn partition_data_files(data_dir: &Path) -> Result<AreaPartition, LoadError> {
    let mut partition = AreaPartition::default();

    for path in discover_data_files(data_dir)? {
        let key = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(area_key);

        match key {
            Some(key) if is_london_area(key) => partition.keep.push(path),
            _ => partition.remove.push(path),
        }
    }

    debug!(
        "Partitioned data files: {} to keep, {} to remove",
        partition.keep.len(),
        partition.remove.len()
    );
    Ok(partition)
}

/// Delete the given files, returning how many were removed.
pub fn remove_files(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Deleted: {}", path.display());
                removed += 1;
            }
            Err(e) => error!("Error deleting {}: {}", path.display(), e),
        }
    }
    removed
}
