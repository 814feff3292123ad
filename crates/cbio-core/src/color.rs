//! Named colors for cancer types.

use cbio_model::{ColorChoice, ImportError, Result};
use rand::Rng;

/// CSS color keywords accepted as `ui_color`.
pub const CSS_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue", "darkcyan",
    "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki", "darkmagenta",
    "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon", "darkseagreen",
    "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise", "darkviolet", "deeppink",
    "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick", "floralwhite", "forestgreen",
    "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod", "gray", "green", "greenyellow",
    "grey", "honeydew", "hotpink", "indianred", "indigo", "ivory", "khaki", "lavender",
    "lavenderblush", "lawngreen", "lemonchiffon", "lightblue", "lightcoral", "lightcyan",
    "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey", "lightpink", "lightsalmon",
    "lightseagreen", "lightskyblue", "lightslategray", "lightslategrey", "lightsteelblue",
    "lightyellow", "lime", "limegreen", "linen", "magenta", "maroon", "mediumaquamarine",
    "mediumblue", "mediumorchid", "mediumpurple", "mediumseagreen", "mediumslateblue",
    "mediumspringgreen", "mediumturquoise", "mediumvioletred", "midnightblue", "mintcream",
    "mistyrose", "moccasin", "navajowhite", "navy", "oldlace", "olive", "olivedrab", "orange",
    "orangered", "orchid", "palegoldenrod", "palegreen", "paleturquoise", "palevioletred",
    "papayawhip", "peachpuff", "peru", "pink", "plum", "powderblue", "purple", "red", "rosybrown",
    "royalblue", "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke", "yellow",
    "yellowgreen",
];

/// Validate a requested color or draw one from `rng`.
pub fn pick_color<R: Rng + ?Sized>(choice: Option<&ColorChoice>, rng: &mut R) -> Result<String> {
    match choice {
        Some(ColorChoice::Name(name)) => {
            let name = name.to_lowercase();
            if CSS_COLORS.contains(&name.as_str()) {
                Ok(name)
            } else {
                Err(ImportError::configuration(format!(
                    "Color {name} is not a valid color name"
                )))
            }
        }
        Some(ColorChoice::Index(index)) => usize::try_from(*index)
            .ok()
            .and_then(|idx| CSS_COLORS.get(idx))
            .map(|color| (*color).to_string())
            .ok_or_else(|| {
                ImportError::configuration(format!(
                    "Color index {index} is out of range: use 0 to {}",
                    CSS_COLORS.len() - 1
                ))
            }),
        None => Ok(CSS_COLORS[rng.random_range(0..CSS_COLORS.len())].to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn names_are_case_insensitive() {
        let mut rng = StdRng::seed_from_u64(1);
        let color = pick_color(Some(&ColorChoice::Name("DarkRed".into())), &mut rng).expect("color");
        assert_eq!(color, "darkred");
    }

    #[test]
    fn unknown_name_and_bad_index_are_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick_color(Some(&ColorChoice::Name("blurple".into())), &mut rng).is_err());
        assert!(pick_color(Some(&ColorChoice::Index(-1)), &mut rng).is_err());
        assert!(pick_color(Some(&ColorChoice::Index(10_000)), &mut rng).is_err());
    }

    #[test]
    fn index_selects_from_list() {
        let mut rng = StdRng::seed_from_u64(1);
        let color = pick_color(Some(&ColorChoice::Index(0)), &mut rng).expect("color");
        assert_eq!(color, "aliceblue");
    }

    #[test]
    fn random_pick_follows_seed() {
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..5)
                .map(|_| pick_color(None, &mut rng).expect("color"))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
        assert!(draw(9).iter().all(|color| CSS_COLORS.contains(&color.as_str())));
    }
}
