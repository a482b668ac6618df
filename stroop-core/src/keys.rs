/// Response keys, assigned to ink colours in this order.
pub const RESPONSE_KEYS: [char; 4] = ['z', 'x', 'n', 'm'];

/// Colour to response-key assignment for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    pairs: Vec<(String, char)>,
}

impl KeyMapping {
    /// Pairs colours with [`RESPONSE_KEYS`] in order. Returns `None` when there
    /// are more colours than keys or a colour is listed twice.
    pub fn assign<I, C>(colors: I) -> Option<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let colors: Vec<String> = colors.into_iter().map(Into::into).collect();
        if colors.len() > RESPONSE_KEYS.len() {
            return None;
        }
        for (i, c) in colors.iter().enumerate() {
            if colors[..i].contains(c) {
                return None;
            }
        }
        let pairs = colors.into_iter().zip(RESPONSE_KEYS).collect();
        Some(Self { pairs })
    }

    pub fn key_for(&self, color: &str) -> Option<char> {
        self.pairs
            .iter()
            .find(|(c, _)| c == color)
            .map(|(_, k)| *k)
    }

    /// Keys accepted during the response window.
    pub fn keys(&self) -> Vec<char> {
        self.pairs.iter().map(|(_, k)| *k).collect()
    }

    /// One instruction line per key, inserted into the info screens.
    pub fn instructions(&self) -> String {
        self.pairs
            .iter()
            .map(|(color, key)| {
                format!(
                    "klawisz {} gdy wyswietlono napis w kolorze {}\n",
                    key.to_ascii_uppercase(),
                    color
                )
            })
            .collect()
    }

    /// Key label row drawn under the stimulus: left-hand pair, gap, right-hand pair.
    pub fn labels(&self) -> String {
        let mut out = String::new();
        for (i, (color, _)) in self.pairs.iter().enumerate() {
            match i {
                0 => {}
                2 => out.push_str(&" ".repeat(20)),
                _ => out.push_str(&" ".repeat(8)),
            }
            out.push_str(color);
        }
        out
    }
}

/// Splits `items` into `n` contiguous blocks whose sizes differ by at most
/// one, larger blocks first. `n == 0` yields a single block.
pub fn split_into_blocks<T>(items: Vec<T>, n: usize) -> Vec<Vec<T>> {
    if n == 0 {
        return vec![items];
    }
    let base = items.len() / n;
    let extra = items.len() % n;
    let mut blocks = Vec::with_capacity(n);
    let mut iter = items.into_iter();
    for i in 0..n {
        let size = base + usize::from(i < extra);
        blocks.push(iter.by_ref().take(size).collect());
    }
    blocks
}
