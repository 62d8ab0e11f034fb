use crate::geo::Coordinates;
use crate::user::User;
use std::collections::BTreeMap;

/// All users at one coordinate pair, under one display name
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedLocation {
    /// The spelling used by the most users at these coordinates
    pub name: String,
    pub coords: Coordinates,
    /// Sorted
    pub usernames: Vec<String>,
}

/// What the map page needs: the merged locations and how many users could
/// or could not be placed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapSummary {
    pub locations: Vec<AggregatedLocation>,
    pub users_with_location: usize,
    pub users_unresolved_location: usize,
    pub users_without_location: usize,
}

/// Group users by exact coordinates, so that different spellings of one
/// place collapse together. Users without coordinates are ignored.
///
/// Output is sorted by name (then coordinates), so identical input always
/// gives identical output.
pub fn aggregate<'a, I>(users: I) -> Vec<AggregatedLocation>
where
    I: IntoIterator<Item = &'a User>,
{
    // coordinate key -> (coordinates, raw location text -> usernames)
    let mut groups: BTreeMap<(u64, u64), (Coordinates, BTreeMap<&'a str, Vec<&'a str>>)> =
        BTreeMap::new();

    for user in users {
        let Some(coords) = user.coords else {
            continue;
        };
        if !user.has_location() {
            continue;
        }
        groups
            .entry(coords.key())
            .or_insert_with(|| (coords, BTreeMap::new()))
            .1
            .entry(user.location.as_str())
            .or_default()
            .push(user.username.as_str());
    }

    let mut output: Vec<AggregatedLocation> = groups
        .into_values()
        .filter_map(|(coords, spellings)| {
            // Spellings iterate in string order; only a strictly larger
            // count displaces the current pick, so ties go to the smaller string.
            let mut name: Option<&str> = None;
            let mut best = 0;
            for (spelling, usernames) in spellings.iter() {
                if usernames.len() > best {
                    best = usernames.len();
                    name = Some(*spelling);
                }
            }
            let name = name?.to_owned();

            let mut usernames: Vec<String> = spellings
                .into_values()
                .flatten()
                .map(|u| u.to_owned())
                .collect();
            usernames.sort();

            Some(AggregatedLocation {
                name,
                coords,
                usernames,
            })
        })
        .collect();

    output.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.coords.key().cmp(&b.coords.key()))
    });
    output
}

/// Aggregate and count users for the map
pub fn summarize<'a, I>(users: I) -> MapSummary
where
    I: IntoIterator<Item = &'a User> + Clone,
{
    let mut summary = MapSummary::default();
    for user in users.clone() {
        if !user.has_location() {
            summary.users_without_location += 1;
        } else if user.coords.is_some() {
            summary.users_with_location += 1;
        } else {
            summary.users_unresolved_location += 1;
        }
    }
    summary.locations = aggregate(users);
    summary
}
