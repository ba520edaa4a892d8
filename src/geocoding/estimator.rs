use std::collections::HashMap;

use crate::models::{CoordinateSource, Coordinates, CENTRAL_LONDON};
use crate::postcode;
use crate::utils::stable_hash;

/// Jitter for postcodes placed at a matched prefix centroid (degrees).
pub const MATCHED_JITTER: f64 = 0.005;
/// Jitter for postcodes placed at the central London default (degrees).
pub const DEFAULT_JITTER: f64 = 0.01;

// (prefix, latitude, longitude, locality)
const CENTROIDS: &[(&str, f64, f64, &str)] = &[
    // North London
    ("N1", 51.5386, -0.1027, "Islington"),
    ("N2", 51.5889, -0.1651, "East Finchley"),
    ("N3", 51.5976, -0.1787, "Finchley Central"),
    ("N4", 51.5706, -0.1057, "Finsbury Park"),
    ("N5", 51.5584, -0.1028, "Highbury"),
    ("N6", 51.5846, -0.1460, "Highgate"),
    ("N7", 51.5523, -0.1173, "Holloway"),
    ("N8", 51.5884, -0.1247, "Hornsey"),
    ("N9", 51.6197, -0.0433, "Lower Edmonton"),
    ("N10", 51.5934, -0.1436, "Muswell Hill"),
    ("N11", 51.6115, -0.1366, "New Southgate"),
    ("N12", 51.6166, -0.1779, "North Finchley"),
    ("N13", 51.6157, -0.1020, "Palmers Green"),
    ("N14", 51.6321, -0.1105, "Southgate"),
    ("N15", 51.5934, -0.0751, "Seven Sisters"),
    ("N16", 51.5634, -0.0750, "Stoke Newington"),
    ("N17", 51.5934, -0.0567, "Tottenham"),
    ("N18", 51.6055, -0.0433, "Upper Edmonton"),
    ("N19", 51.5656, -0.1340, "Upper Holloway"),
    ("N20", 51.6300, -0.1750, "Whetstone"),
    ("N21", 51.6520, -0.1105, "Winchmore Hill"),
    ("N22", 51.5990, -0.1120, "Wood Green"),
    // North West London
    ("NW1", 51.5454, -0.1576, "Camden/Regent's Park"),
    ("NW2", 51.5591, -0.2135, "Cricklewood"),
    ("NW3", 51.5591, -0.1787, "Hampstead"),
    ("NW4", 51.5900, -0.2250, "Hendon"),
    ("NW5", 51.5540, -0.1460, "Kentish Town"),
    ("NW6", 51.5434, -0.1936, "West Hampstead"),
    ("NW7", 51.6150, -0.2450, "Mill Hill"),
    ("NW8", 51.5329, -0.1717, "St John's Wood"),
    ("NW9", 51.5900, -0.2600, "Colindale"),
    ("NW10", 51.5400, -0.2487, "Willesden"),
    ("NW11", 51.5770, -0.2000, "Golders Green"),
    // East London
    ("E1", 51.5154, -0.0648, "Whitechapel"),
    ("E2", 51.5290, -0.0648, "Bethnal Green"),
    ("E3", 51.5290, -0.0254, "Bow"),
    ("E4", 51.6250, 0.0096, "Chingford"),
    ("E5", 51.5591, -0.0567, "Clapton"),
    ("E6", 51.5250, 0.0576, "East Ham"),
    ("E7", 51.5480, 0.0250, "Forest Gate"),
    ("E8", 51.5430, -0.0650, "Hackney"),
    ("E9", 51.5454, -0.0420, "Homerton"),
    ("E10", 51.5680, -0.0130, "Leyton"),
    ("E11", 51.5680, 0.0096, "Leytonstone"),
    ("E12", 51.5500, 0.0500, "Manor Park"),
    ("E13", 51.5250, 0.0250, "Plaistow"),
    ("E14", 51.5054, -0.0196, "Poplar/Canary Wharf"),
    ("E15", 51.5434, -0.0033, "Stratford"),
    ("E16", 51.5100, 0.0315, "Canning Town"),
    ("E17", 51.5884, -0.0254, "Walthamstow"),
    ("E18", 51.5934, 0.0250, "South Woodford"),
    // South East London
    ("SE1", 51.5004, -0.0922, "Southwark"),
    ("SE2", 51.4904, 0.1226, "Abbey Wood"),
    ("SE3", 51.4634, 0.0150, "Blackheath"),
    ("SE4", 51.4634, -0.0346, "Brockley"),
    ("SE5", 51.4724, -0.0922, "Camberwell"),
    ("SE6", 51.4404, -0.0196, "Catford"),
    ("SE7", 51.4814, 0.0400, "Charlton"),
    ("SE8", 51.4804, -0.0296, "Deptford"),
    ("SE9", 51.4434, 0.0596, "Eltham"),
    ("SE10", 51.4814, -0.0033, "Greenwich"),
    ("SE11", 51.4904, -0.1123, "Kennington"),
    ("SE12", 51.4454, 0.0196, "Lee"),
    ("SE13", 51.4604, -0.0103, "Lewisham"),
    ("SE14", 51.4774, -0.0446, "New Cross"),
    ("SE15", 51.4704, -0.0648, "Peckham"),
    ("SE16", 51.4954, -0.0509, "Rotherhithe"),
    ("SE17", 51.4884, -0.0946, "Walworth"),
    ("SE18", 51.4854, 0.0735, "Woolwich"),
    ("SE19", 51.4184, -0.0846, "Upper Norwood"),
    ("SE20", 51.4114, -0.0566, "Anerley"),
    ("SE21", 51.4414, -0.0876, "Dulwich"),
    ("SE22", 51.4524, -0.0706, "East Dulwich"),
    ("SE23", 51.4424, -0.0486, "Forest Hill"),
    ("SE24", 51.4534, -0.0996, "Herne Hill"),
    ("SE25", 51.3984, -0.0756, "South Norwood"),
    ("SE26", 51.4274, -0.0556, "Sydenham"),
    ("SE27", 51.4314, -0.1006, "West Norwood"),
    ("SE28", 51.5024, 0.1076, "Thamesmead"),
    // South West London
    ("SW1", 51.4954, -0.1423, "Westminster"),
    ("SW2", 51.4504, -0.1173, "Brixton Hill"),
    ("SW3", 51.4904, -0.1673, "Chelsea"),
    ("SW4", 51.4634, -0.1423, "Clapham"),
    ("SW5", 51.4904, -0.1906, "Earl's Court"),
    ("SW6", 51.4774, -0.2017, "Fulham"),
    ("SW7", 51.4954, -0.1747, "South Kensington"),
    ("SW8", 51.4774, -0.1301, "South Lambeth"),
    ("SW9", 51.4664, -0.1173, "Stockwell"),
    ("SW10", 51.4834, -0.1836, "West Brompton"),
    ("SW11", 51.4664, -0.1673, "Battersea"),
    ("SW12", 51.4454, -0.1473, "Balham"),
    ("SW13", 51.4754, -0.2405, "Barnes"),
    ("SW14", 51.4654, -0.2613, "Mortlake"),
    ("SW15", 51.4574, -0.2187, "Putney"),
    ("SW16", 51.4224, -0.1273, "Streatham"),
    ("SW17", 51.4304, -0.1673, "Tooting"),
    ("SW18", 51.4534, -0.1936, "Wandsworth"),
    ("SW19", 51.4214, -0.2036, "Wimbledon"),
    ("SW20", 51.4094, -0.2236, "Raynes Park"),
    // West London
    ("W1", 51.5154, -0.1423, "Marylebone/Mayfair"),
    ("W2", 51.5154, -0.1817, "Paddington"),
    ("W3", 51.5104, -0.2687, "Acton"),
    ("W4", 51.4904, -0.2613, "Chiswick"),
    ("W5", 51.5134, -0.3030, "Ealing"),
    ("W6", 51.4924, -0.2268, "Hammersmith"),
    ("W7", 51.5104, -0.3342, "Hanwell"),
    ("W8", 51.5004, -0.1936, "Kensington"),
    ("W9", 51.5254, -0.1917, "Maida Vale"),
    ("W10", 51.5224, -0.2168, "Ladbroke Grove"),
    ("W11", 51.5124, -0.2017, "Notting Hill"),
    ("W12", 51.5074, -0.2328, "Shepherd's Bush"),
    ("W13", 51.5104, -0.3192, "West Ealing"),
    ("W14", 51.4954, -0.2097, "West Kensington"),
    // Central London
    ("EC1", 51.5254, -0.1046, "Clerkenwell"),
    ("EC2", 51.5184, -0.0882, "Bank/Moorgate"),
    ("EC3", 51.5124, -0.0796, "Monument/Tower"),
    ("EC4", 51.5134, -0.1026, "Fleet Street/St Paul's"),
    ("WC1", 51.5224, -0.1220, "Bloomsbury"),
    ("WC2", 51.5124, -0.1230, "Covent Garden"),
    // Outer London
    ("BR1", 51.4054, 0.0196, "Bromley"),
    ("BR2", 51.3844, 0.0315, "Hayes (Bromley)"),
    ("BR3", 51.4034, -0.0306, "Beckenham"),
    ("BR5", 51.3834, 0.1006, "Orpington"),
    ("BR6", 51.3654, 0.0906, "Orpington"),
    ("BR7", 51.4134, 0.0696, "Chislehurst"),
    ("CR0", 51.3744, -0.0922, "Croydon"),
    ("CR2", 51.3454, -0.0822, "South Croydon"),
    ("CR4", 51.4004, -0.1623, "Mitcham"),
    ("CR5", 51.3154, -0.1323, "Coulsdon"),
    ("CR7", 51.3944, -0.1048, "Thornton Heath"),
    ("CR8", 51.3344, -0.1123, "Purley"),
    ("DA1", 51.4444, 0.2196, "Dartford"),
    ("DA5", 51.4404, 0.1466, "Bexley"),
    ("DA6", 51.4564, 0.1396, "Bexleyheath"),
    ("DA7", 51.4624, 0.1436, "Bexleyheath"),
    ("DA8", 51.4804, 0.1826, "Erith"),
    ("DA14", 51.4264, 0.1056, "Sidcup"),
    ("DA15", 51.4354, 0.0996, "Sidcup"),
    ("DA16", 51.4634, 0.1036, "Welling"),
    ("EN1", 51.6520, -0.0796, "Enfield"),
    ("EN2", 51.6566, -0.0896, "Enfield"),
    ("EN3", 51.6566, -0.0406, "Enfield Highway"),
    ("EN4", 51.6456, -0.1626, "Cockfosters"),
    ("EN5", 51.6526, -0.2006, "Barnet"),
    ("HA0", 51.5531, -0.2973, "Wembley"),
    ("HA1", 51.5791, -0.3367, "Harrow"),
    ("HA2", 51.5710, -0.3567, "South Harrow"),
    ("HA3", 51.5940, -0.3262, "Harrow Weald"),
    ("HA4", 51.5734, -0.4180, "Ruislip"),
    ("HA5", 51.5929, -0.3787, "Pinner"),
    ("HA6", 51.6111, -0.4230, "Northwood"),
    ("HA7", 51.6125, -0.3057, "Stanmore"),
    ("HA8", 51.6136, -0.2759, "Edgware"),
    ("HA9", 51.5611, -0.2819, "Wembley"),
    ("IG1", 51.5585, 0.0719, "Ilford"),
    ("IG2", 51.5755, 0.0756, "Gants Hill"),
    ("IG3", 51.5645, 0.1036, "Seven Kings"),
    ("IG4", 51.5775, 0.0456, "Redbridge"),
    ("IG5", 51.5875, 0.0626, "Clayhall"),
    ("IG6", 51.5965, 0.0819, "Barkingside"),
    ("IG7", 51.6216, 0.0819, "Chigwell"),
    ("IG8", 51.6085, 0.0335, "Woodford Green"),
    ("IG9", 51.6285, 0.0366, "Buckhurst Hill"),
    ("IG10", 51.6470, 0.0626, "Loughton"),
    ("IG11", 51.5381, 0.0819, "Barking"),
    ("KT1", 51.4094, -0.3010, "Kingston upon Thames"),
    ("KT2", 51.4184, -0.2890, "Kingston upon Thames"),
    ("KT3", 51.4014, -0.2590, "New Malden"),
    ("KT4", 51.3784, -0.2465, "Worcester Park"),
    ("KT5", 51.3934, -0.2865, "Surbiton"),
    ("KT6", 51.3854, -0.3020, "Surbiton"),
    ("RM1", 51.5779, 0.1820, "Romford"),
    ("RM2", 51.5859, 0.2000, "Gidea Park"),
    ("RM3", 51.6019, 0.2380, "Harold Wood"),
    ("RM5", 51.5999, 0.1426, "Collier Row"),
    ("RM6", 51.5721, 0.1346, "Chadwell Heath"),
    ("RM7", 51.5684, 0.1626, "Rush Green"),
    ("RM8", 51.5529, 0.1296, "Becontree"),
    ("RM9", 51.5384, 0.1296, "Becontree Heath"),
    ("RM10", 51.5454, 0.1566, "Dagenham"),
    ("RM11", 51.5729, 0.2136, "Emerson Park"),
    ("RM12", 51.5541, 0.2096, "Hornchurch"),
    ("RM13", 51.5209, 0.1996, "Rainham"),
    ("RM14", 51.5574, 0.2496, "Upminster"),
    ("SM1", 51.3616, -0.1933, "Sutton"),
    ("SM2", 51.3486, -0.1987, "Belmont"),
    ("SM3", 51.3674, -0.2187, "Cheam"),
    ("SM4", 51.3934, -0.1973, "Morden"),
    ("SM5", 51.3634, -0.1683, "Carshalton"),
    ("SM6", 51.3584, -0.1493, "Wallington"),
    ("TW1", 51.4484, -0.3260, "Twickenham"),
    ("TW2", 51.4484, -0.3497, "Whitton"),
    ("TW3", 51.4684, -0.3662, "Hounslow"),
    ("TW4", 51.4634, -0.3862, "Hounslow West"),
    ("TW5", 51.4814, -0.3762, "Heston"),
    ("TW7", 51.4754, -0.3367, "Isleworth"),
    ("TW8", 51.4864, -0.3093, "Brentford"),
    ("TW9", 51.4634, -0.2990, "Richmond"),
    ("TW10", 51.4434, -0.3010, "Ham"),
    ("TW11", 51.4274, -0.3310, "Teddington"),
    ("TW12", 51.4184, -0.3667, "Hampton"),
    ("TW13", 51.4404, -0.4062, "Feltham"),
    ("TW14", 51.4534, -0.4267, "Hatton"),
    ("TW15", 51.4294, -0.5080, "Ashford"),
    ("TW16", 51.4034, -0.4187, "Sunbury"),
    ("TW17", 51.3964, -0.4462, "Shepperton"),
    ("TW18", 51.4324, -0.5067, "Staines"),
    ("TW19", 51.4534, -0.5104, "Stanwell"),
    ("TW20", 51.4274, -0.5484, "Egham"),
    ("UB1", 51.5104, -0.3813, "Southall"),
    ("UB2", 51.4994, -0.3780, "Southall"),
    ("UB3", 51.5029, -0.4213, "Hayes"),
    ("UB4", 51.5199, -0.4180, "Hayes"),
    ("UB5", 51.5434, -0.3663, "Northolt"),
    ("UB6", 51.5384, -0.3380, "Greenford"),
    ("UB7", 51.5029, -0.4704, "West Drayton"),
    ("UB8", 51.5434, -0.4813, "Uxbridge"),
    ("UB9", 51.5791, -0.4813, "Harefield"),
    ("UB10", 51.5534, -0.4480, "Hillingdon"),
    // Postal areas, used when no district matches
    ("N", 51.5900, -0.1100, "North London"),
    ("NW", 51.5600, -0.2000, "North West London"),
    ("E", 51.5400, -0.0200, "East London"),
    ("SE", 51.4600, -0.0400, "South East London"),
    ("SW", 51.4600, -0.1800, "South West London"),
    ("W", 51.5100, -0.2400, "West London"),
    ("EC", 51.5180, -0.0940, "City of London"),
    ("WC", 51.5180, -0.1230, "West Central London"),
    ("BR", 51.3900, 0.0400, "Bromley"),
    ("CR", 51.3600, -0.1000, "Croydon"),
    ("DA", 51.4400, 0.1800, "Dartford"),
    ("EN", 51.6500, -0.1000, "Enfield"),
    ("HA", 51.5800, -0.3400, "Harrow"),
    ("IG", 51.5800, 0.0700, "Ilford"),
    ("KT", 51.3800, -0.3200, "Kingston upon Thames"),
    ("RM", 51.5600, 0.1900, "Romford"),
    ("SM", 51.3600, -0.1900, "Sutton"),
    ("TW", 51.4500, -0.3800, "Twickenham"),
    ("UB", 51.5300, -0.4200, "Southall"),
    ("AL", 51.7500, -0.3400, "St Albans"),
    ("CM", 51.7400, 0.4700, "Chelmsford"),
    ("GU", 51.2400, -0.5700, "Guildford"),
    ("HP", 51.7500, -0.6000, "Hemel Hempstead"),
    ("LU", 51.8800, -0.4200, "Luton"),
    ("ME", 51.3400, 0.5200, "Medway"),
    ("MK", 52.0400, -0.7600, "Milton Keynes"),
    ("RG", 51.4500, -0.9700, "Reading"),
    ("RH", 51.2400, -0.1700, "Redhill"),
    ("SG", 51.9000, -0.2000, "Stevenage"),
    ("SL", 51.5100, -0.5900, "Slough"),
    ("SS", 51.5500, 0.7100, "Southend-on-Sea"),
    ("TN", 51.1300, 0.2600, "Tonbridge"),
    ("WD", 51.6600, -0.4000, "Watford"),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    pub coordinates: Coordinates,
    pub locality: &'static str,
}

/// A coarse location derived from a postcode prefix
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Matched prefix, `None` when placed at the default location
    pub prefix: Option<String>,
    pub centroid: Coordinates,
    pub coordinates: Coordinates,
    pub source: CoordinateSource,
}

/// Coordinate estimation from postcode prefixes
#[derive(Debug, Clone)]
pub struct PrefixEstimator {
    centroids: HashMap<&'static str, Centroid>,
}

impl Default for PrefixEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixEstimator {
    pub fn new() -> Self {
        let centroids = CENTROIDS
            .iter()
            .map(|&(prefix, latitude, longitude, locality)| {
                (
                    prefix,
                    Centroid {
                        coordinates: Coordinates::new(latitude, longitude),
                        locality,
                    },
                )
            })
            .collect();
        Self { centroids }
    }

    pub fn centroid(&self, prefix: &str) -> Option<Centroid> {
        self.centroids.get(prefix).copied()
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// First prefix of `postcode` with a known centroid, most specific first.
    pub fn matched_prefix(&self, postcode: &str) -> Option<(String, Centroid)> {
        postcode::prefix_candidates(postcode)
            .into_iter()
            .find_map(|prefix| self.centroid(&prefix).map(|centroid| (prefix, centroid)))
    }

    /// Estimate coordinates for a postcode. `None` only for blank input.
    pub fn estimate(&self, postcode: &str) -> Option<Estimate> {
        let key = postcode::normalize(postcode)?;

        let estimate = match self.matched_prefix(postcode) {
            Some((prefix, centroid)) => Estimate {
                prefix: Some(prefix),
                centroid: centroid.coordinates,
                coordinates: jitter(centroid.coordinates, &key, MATCHED_JITTER),
                source: CoordinateSource::Estimated,
            },
            None => Estimate {
                prefix: None,
                centroid: CENTRAL_LONDON,
                coordinates: jitter(CENTRAL_LONDON, &key, DEFAULT_JITTER),
                source: CoordinateSource::Default,
            },
        };
        Some(estimate)
    }
}

/// Offset `centroid` by up to `amplitude` degrees on each axis.
///
/// The offset is derived from the postcode so repeated runs place a postcode
/// at the same spot while distinct postcodes in one district do not overlap.
pub fn jitter(centroid: Coordinates, postcode_key: &str, amplitude: f64) -> Coordinates {
    let hash = stable_hash(postcode_key);
    let unit = |bits: u64| (bits & 0xFFFF_FFFF) as f64 / u32::MAX as f64 * 2.0 - 1.0;

    centroid.offset(unit(hash) * amplitude, unit(hash >> 32) * amplitude)
}
