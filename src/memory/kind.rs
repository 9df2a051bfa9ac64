use std::fmt;

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Kind {
    Rom,
    Ram,
    Io,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Kind::Rom => "ROM",
            Kind::Ram => "RAM",
            Kind::Io => "IO",
        };
        f.write_str(name)
    }
}
