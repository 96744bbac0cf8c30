//! Collapse a full transit route into the stops that matter:
//! origin → boarding stations → final alighting station → destination.
//!
//! Positions on the full route are indexed origin = 0, then every station of
//! every leg in order, then destination = `full_length - 1`.

use serde::Serialize;

use crate::models::{RouteResult, TransportMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRoute {
    pub labels: Vec<String>,
    /// Ascending full-route index of each label.
    pub full_indices: Vec<usize>,
    pub full_length: usize,
}

impl KeyRoute {
    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

pub fn reduce_route(route: Option<&RouteResult>, origin: &str, destination: &str) -> KeyRoute {
    let full_length = route.map_or(2, RouteResult::full_length);
    let mut labels = vec![origin.to_string()];
    let mut full_indices = vec![0];

    let mut running = 1;
    let mut alighting: Option<(usize, String)> = None;

    for leg in route.map(|r| r.legs.as_slice()).unwrap_or_default() {
        let n = leg.stations.len();
        if n == 0 {
            continue;
        }
        if leg.mode == TransportMode::Rail {
            full_indices.push(running);
            labels.push(or_fallback(&leg.stations[0].name, &leg.start_name));
            alighting = Some((running + n - 1, or_fallback(&leg.stations[n - 1].name, &leg.end_name)));
        }
        running += n;
    }

    if let Some((index, label)) = alighting {
        if full_indices.last() != Some(&index) {
            full_indices.push(index);
            labels.push(label);
        }
    }

    full_indices.push(full_length - 1);
    labels.push(destination.to_string());

    KeyRoute {
        labels,
        full_indices,
        full_length,
    }
}

fn or_fallback(name: &str, fallback: &str) -> String {
    let chosen = if name.is_empty() { fallback } else { name };
    chosen.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Leg, Station};

    fn leg(mode: u8, start: &str, end: &str, stations: &[&str]) -> Leg {
        Leg {
            mode: TransportMode::from(mode),
            duration_min: 10,
            distance_m: 1000,
            start_name: start.into(),
            end_name: end.into(),
            line_name: None,
            stations: stations.iter().map(|s| Station { name: s.to_string() }).collect(),
        }
    }

    fn route(legs: Vec<Leg>) -> RouteResult {
        RouteResult {
            legs,
            ..RouteResult::default()
        }
    }

    #[test]
    fn test_transfer_route() {
        let r = route(vec![
            leg(3, "집", "신림", &[]),
            leg(1, "신림", "신도림", &["신림", "신대방", "구로디지털단지", "대림", "신도림"]),
            leg(1, "신도림", "시청", &["신도림", "영등포", "서울역", "시청"]),
            leg(3, "시청", "회사", &[]),
        ]);
        let key = reduce_route(Some(&r), "집", "회사");

        assert_eq!(key.full_length, 11);
        assert_eq!(key.labels, vec!["집", "신림", "신도림", "시청", "회사"]);
        assert_eq!(key.full_indices, vec![0, 1, 6, 9, 10]);
    }

    #[test]
    fn test_bus_stations_advance_index() {
        let r = route(vec![
            leg(2, "정류장", "강남역", &["정류장", "논현", "강남역"]),
            leg(1, "강남", "역삼", &["강남", "역삼"]),
        ]);
        let key = reduce_route(Some(&r), "집", "회사");

        assert_eq!(key.labels, vec!["집", "강남", "역삼", "회사"]);
        assert_eq!(key.full_indices, vec![0, 4, 5, 6]);
    }

    #[test]
    fn test_single_station_rail_leg_not_duplicated() {
        let r = route(vec![leg(1, "판교", "판교", &["판교"])]);
        let key = reduce_route(Some(&r), "집", "회사");

        assert_eq!(key.labels, vec!["집", "판교", "회사"]);
        assert_eq!(key.full_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_missing_station_names_use_leg_endpoints() {
        let r = route(vec![leg(1, "수서", "복정", &["", "가락시장", ""])]);
        let key = reduce_route(Some(&r), "집", "회사");

        assert_eq!(key.labels, vec!["집", "수서", "복정", "회사"]);
    }

    #[test]
    fn test_degenerate_routes() {
        let no_route = reduce_route(None, "집", "회사");
        assert_eq!(no_route.labels, vec!["집", "회사"]);
        assert_eq!(no_route.full_indices, vec![0, 1]);

        let bus_only = route(vec![leg(2, "a", "c", &["a", "b", "c"])]);
        let key = reduce_route(Some(&bus_only), "집", "회사");
        assert_eq!(key.labels, vec!["집", "회사"]);
        assert_eq!(key.full_indices, vec![0, 4]);
    }

    #[test]
    fn test_key_route_bounds() {
        let shapes: Vec<Vec<Leg>> = vec![
            vec![leg(1, "a", "b", &["a", "b"])],
            vec![leg(1, "a", "b", &["a", "b"]), leg(3, "b", "c", &[]), leg(1, "c", "d", &["c", "x", "d"])],
            vec![leg(1, "a", "a", &["a"]), leg(1, "b", "b", &["b"]), leg(2, "c", "d", &["c", "d"])],
            vec![leg(2, "a", "b", &["a", "b"]), leg(1, "c", "e", &["c", "d", "e"]), leg(1, "f", "g", &["f", "g"])],
        ];

        for legs in shapes {
            let rail_legs = legs.iter().filter(|l| l.mode == TransportMode::Rail).count();
            let r = route(legs);
            let key = reduce_route(Some(&r), "집", "회사");

            assert_eq!(key.labels.first().map(String::as_str), Some("집"));
            assert_eq!(key.labels.last().map(String::as_str), Some("회사"));
            assert!(key.len() <= 2 + rail_legs * 2);
            assert_eq!(key.labels.len(), key.full_indices.len());
            assert!(key.full_indices.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(*key.full_indices.last().unwrap(), r.full_length() - 1);
        }
    }
}
