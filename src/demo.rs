use geo::{LineString, MultiPolygon, Polygon};

use crate::boundary::{BoundaryCollection, GeoRegion};
use crate::content::{AreaCode, Content, Municipality, MunicipalityPrefecture, River, Road, StudyQuestion};

#[cfg(test)]
use crate::generate::{municipality_questions, prefecture_questions};
#[cfg(test)]
use crate::quiz::{Draw, Scope};
#[cfg(test)]
use rand::SeedableRng;

/// Question count offered by the demo front end.
pub const DEMO_QUESTION_COUNT: usize = 5;

/// Calibration of the demo national map on a 1000x1000 surface.
pub const DEMO_MAP_SURFACE: &str = r#"{
    "viewBox": "0 0 1000 1000",
    "projection": {
        "main": { "cx": 500, "cy": 500, "midLng": 137.5, "midLat": 37.5, "scale": 45 },
        "okinawa": { "offsetX": 20, "offsetY": 20, "w": 220, "h": 160, "midLng": 127.0, "midLat": 26.0, "scale": 60 }
    }
}"#;

fn municipality(name: &str, reading: &str, lat: f64, lng: f64, code: &str) -> Municipality {
    Municipality {
        name: name.to_string(),
        reading: reading.to_string(),
        lat,
        lng,
        code: Some(code.to_string()),
    }
}

fn prefecture(
    code: &str,
    name: &str,
    region: &str,
    municipalities: Vec<Municipality>,
) -> MunicipalityPrefecture {
    MunicipalityPrefecture {
        code: code.to_string(),
        name: name.to_string(),
        region: region.to_string(),
        municipalities,
    }
}

fn codes(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn demo_prefectures() -> Vec<MunicipalityPrefecture> {
    vec![
        prefecture(
            "01",
            "北海道",
            "hokkaido",
            vec![
                municipality("札幌市", "さっぽろし", 43.0618, 141.3545, "01100"),
                municipality("函館市", "はこだてし", 41.7687, 140.7288, "01202"),
            ],
        ),
        prefecture(
            "11",
            "埼玉県",
            "kanto",
            vec![
                municipality("さいたま市", "さいたまし", 35.8617, 139.6455, "11100"),
                municipality("川越市", "かわごえし", 35.9251, 139.4858, "11201"),
            ],
        ),
        prefecture(
            "13",
            "東京都",
            "kanto",
            vec![
                municipality("八王子市", "はちおうじし", 35.6664, 139.3160, "13201"),
                municipality("立川市", "たちかわし", 35.6939, 139.4075, "13202"),
                municipality("府中市", "ふちゅうし", 35.6689, 139.4776, "13206"),
                municipality("町田市", "まちだし", 35.5466, 139.4386, "13209"),
            ],
        ),
        prefecture(
            "14",
            "神奈川県",
            "kanto",
            vec![
                municipality("横浜市", "よこはまし", 35.4437, 139.6380, "14100"),
                municipality("川崎市", "かわさきし", 35.5308, 139.7029, "14130"),
                municipality("相模原市", "さがみはらし", 35.5714, 139.3733, "14150"),
            ],
        ),
        prefecture("22", "静岡県", "chubu", Vec::new()),
        prefecture("23", "愛知県", "chubu", Vec::new()),
        prefecture("24", "三重県", "kinki", Vec::new()),
        prefecture("25", "滋賀県", "kinki", Vec::new()),
        prefecture("26", "京都府", "kinki", Vec::new()),
        prefecture(
            "27",
            "大阪府",
            "kinki",
            vec![
                municipality("大阪市", "おおさかし", 34.6937, 135.5023, "27100"),
                municipality("堺市", "さかいし", 34.5733, 135.4830, "27140"),
                municipality("豊中市", "とよなかし", 34.7812, 135.4699, "27203"),
            ],
        ),
        prefecture(
            "28",
            "兵庫県",
            "kinki",
            vec![
                municipality("神戸市", "こうべし", 34.6901, 135.1955, "28100"),
                municipality("姫路市", "ひめじし", 34.8151, 134.6853, "28201"),
            ],
        ),
        prefecture(
            "47",
            "沖縄県",
            "okinawa",
            vec![
                municipality("那覇市", "なはし", 26.2124, 127.6809, "47201"),
                municipality("石垣市", "いしがきし", 24.3448, 124.1572, "47207"),
            ],
        ),
    ]
}

fn demo_roads() -> Vec<Road> {
    let road = |name: &str, category: &str, prefectures: &[&str]| Road {
        name: name.to_string(),
        category: category.to_string(),
        prefectures: codes(prefectures),
    };

    vec![
        road("国道1号", "一般国道", &["13", "14", "22", "23", "24", "25", "26", "27"]),
        road("国道43号", "一般国道", &["27", "28"]),
        road("国道390号", "一般国道", &["47"]),
        road("東名高速道路", "高速道路", &["13", "14", "22", "23"]),
        road("道央自動車道", "高速道路", &["01"]),
    ]
}

fn demo_rivers() -> Vec<River> {
    let river = |name: &str, reading: &str, prefectures: &[&str]| River {
        name: name.to_string(),
        reading: Some(reading.to_string()),
        prefectures: codes(prefectures),
    };

    vec![
        river("荒川", "あらかわ", &["11", "13"]),
        river("鶴見川", "つるみがわ", &["13", "14"]),
        river("淀川", "よどがわ", &["25", "26", "27"]),
        river("武庫川", "むこがわ", &["28"]),
        river("石狩川", "いしかりがわ", &["01"]),
    ]
}

fn demo_area_codes() -> Vec<AreaCode> {
    let area = |code: &str, city: &str, pref_code: &str, region: &str| AreaCode {
        code: code.to_string(),
        city: city.to_string(),
        pref_code: pref_code.to_string(),
        region: region.to_string(),
    };

    vec![
        area("011", "札幌", "01", "hokkaido"),
        area("048", "さいたま", "11", "kanto"),
        area("03", "東京23区", "13", "kanto"),
        area("045", "横浜", "14", "kanto"),
        area("052", "名古屋", "23", "chubu"),
        area("075", "京都", "26", "kinki"),
        area("06", "大阪", "27", "kinki"),
        area("078", "神戸", "28", "kinki"),
        area("098", "那覇", "47", "okinawa"),
    ]
}

fn demo_study_questions() -> Vec<StudyQuestion> {
    let question = |id: &str, category: &str, text: &str, options: &[&str], correct: usize, explanation: &str| {
        StudyQuestion {
            id: id.to_string(),
            category: category.to_string(),
            difficulty: 1,
            question: text.to_string(),
            options: codes(options),
            correct_answer: correct,
            explanation: explanation.to_string(),
        }
    };

    vec![
        question(
            "basics-1",
            "basics",
            "日本の都道府県はいくつ？",
            &["43", "46", "47", "48"],
            2,
            "1都1道2府43県で47です。",
        ),
        question(
            "basics-2",
            "basics",
            "市外局番「098」の都市は？",
            &["那覇", "鹿児島", "熊本", "福岡"],
            0,
            "098は沖縄県那覇市の市外局番です。",
        ),
        question(
            "basics-3",
            "basics",
            "淀川が注ぐ湾は？",
            &["東京湾", "大阪湾", "伊勢湾", "博多湾"],
            1,
            "琵琶湖から流れ出て大阪湾に注ぎます。",
        ),
        question(
            "roads-1",
            "roads",
            "国道1号の起点は？",
            &["日本橋", "梅田", "札幌", "那覇"],
            0,
            "東京都中央区の日本橋が起点です。",
        ),
    ]
}

/// Complete sample content for the demo front end and tests.
pub fn demo_content() -> Content {
    Content {
        prefectures: demo_prefectures(),
        roads: demo_roads(),
        rivers: demo_rivers(),
        area_codes: demo_area_codes(),
        study_questions: demo_study_questions(),
    }
}

fn square(lng: f64, lat: f64, size: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(vec![
            (lng, lat),
            (lng + size, lat),
            (lng + size, lat + size),
            (lng, lat + size),
            (lng, lat),
        ]),
        Vec::new(),
    )])
}

/// Simplified ward outlines for Osaka with the two 北区 that share a name.
pub fn demo_boundaries() -> BoundaryCollection {
    let region = |code: &str, name: &str, parent: Option<&str>, lng: f64, lat: f64| GeoRegion {
        code: code.to_string(),
        name: name.to_string(),
        parent: parent.map(str::to_string),
        geometry: square(lng, lat, 0.02),
    };

    BoundaryCollection::new(vec![
        region("27127", "北区", Some("大阪市"), 135.50, 34.70),
        region("27128", "中央区", Some("大阪市"), 135.50, 34.67),
        region("27141", "堺区", Some("堺市"), 135.47, 34.57),
        region("27146", "北区", Some("堺市"), 135.50, 34.57),
        region("27203", "豊中市", None, 135.46, 34.78),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::MapSurface;
    use rand::rngs::StdRng;

    #[test]
    fn content_supports_national_prefecture_quiz() {
        let mut rng = StdRng::seed_from_u64(10);
        let questions = prefecture_questions(
            &mut rng,
            &demo_content().prefectures,
            &Scope::National,
            Draw::new(DEMO_QUESTION_COUNT),
        );

        assert_eq!(questions.len(), DEMO_QUESTION_COUNT);
        assert!(questions.iter().all(|question| question.options.len() == 4));
    }

    #[test]
    fn content_supports_intra_prefecture_quiz() {
        let mut rng = StdRng::seed_from_u64(15);
        let questions = municipality_questions(
            &mut rng,
            &demo_content().prefectures,
            &Scope::Prefecture("14".to_string()),
            Draw::new(DEMO_QUESTION_COUNT),
        );

        assert_eq!(questions.len(), 3);
    }

    #[test]
    fn roads_and_rivers_reference_known_prefectures() {
        let content = demo_content();
        let names = content.prefecture_names();

        for code in content
            .roads
            .iter()
            .flat_map(|road| &road.prefectures)
            .chain(content.rivers.iter().flat_map(|river| &river.prefectures))
            .chain(content.area_codes.iter().map(|area| &area.pref_code))
        {
            assert!(names.contains_key(code), "unknown prefecture {code}");
        }
    }

    #[test]
    fn boundaries_share_a_ward_name() {
        let boundaries = demo_boundaries();

        assert!(boundaries.has_duplicate_names());
        assert_eq!(boundaries.len(), 5);
    }

    #[test]
    fn map_surface_calibration_parses() {
        let surface = MapSurface::from_json(DEMO_MAP_SURFACE).expect("demo calibration is valid");

        assert_eq!(surface.extent.width, 1000.0);
        let naha = surface.project(26.2124, 127.6809);
        assert!(naha.x < 240.0 && naha.y < 180.0, "Naha lands in the inset");
    }
}
