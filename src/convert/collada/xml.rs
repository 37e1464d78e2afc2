//! Helpers to make writing XML less unpleasant.
//!
//! `Xml` is a string buffer that tracks indentation; the `xml!` macro lets
//! you write something that looks like the document you want:
//!
//!     xml!(xml;
//!         <node id=["joint"(i)]>;
//!             <matrix>MATRIX(&m)</matrix>;
//!         /node>;
//!     );
//!
//! `;` starts a new line, `/tag>` closes a tag on its own line, `(expr)`
//! writes anything `Display`, and `LIST(iter)` writes a space-separated list.

use cgmath::Matrix4;
use std::fmt::{self, Display, Write};

pub struct Xml {
    s: String,
    cur_indent: u32,
}

static INDENT_SIZE: u32 = 2;

impl Xml {
    pub fn with_capacity(capacity: usize) -> Xml {
        Xml {
            s: String::with_capacity(capacity),
            cur_indent: 0,
        }
    }

    /// An empty buffer at the same indentation as `self`. Write into it and
    /// `append` it back later to emit part of a document out of order.
    pub fn fork(&self) -> Xml {
        Xml {
            s: String::new(),
            cur_indent: self.cur_indent,
        }
    }

    /// Append a buffer made with `fork`. It must have closed every tag it
    /// opened.
    pub fn append(&mut self, other: Xml) {
        debug_assert_eq!(self.cur_indent, other.cur_indent);
        self.s.push_str(&other.s);
    }

    pub fn string(self) -> String {
        self.s
    }

    pub fn start_open_tag(&mut self) {
        self.s.push_str("<");
        self.cur_indent += 1;
    }

    pub fn start_close_tag(&mut self) {
        self.s.push_str("</");
        self.cur_indent -= 1;
    }

    pub fn deindent_and_start_close_tag(&mut self) {
        for _ in 0..INDENT_SIZE {
            self.s.pop();
        }
        self.s.push_str("</");
        self.cur_indent -= 1;
    }

    pub fn nl(&mut self) {
        self.s.push_str("\n");
        for _ in 0..self.cur_indent {
            for _ in 0..INDENT_SIZE {
                self.s.push(' ');
            }
        }
    }

    pub fn end_tag(&mut self) {
        self.s.push_str(">");
    }

    pub fn end_empty_tag(&mut self) {
        self.s.push_str("/>");
        self.cur_indent -= 1;
    }

    pub fn push_str(&mut self, s: &str) {
        self.s.push_str(s);
    }

    pub fn push_text<T: Display>(&mut self, x: &T) {
        write!(&mut self.s, "{}", x).unwrap();
    }

    pub fn list<I>(&mut self, it: I)
    where I: IntoIterator, I::Item: Display {
        let mut first = true;
        for x in it {
            if !first {
                self.s.push(' ');
            }
            first = false;
            write!(&mut self.s, "{}", x).unwrap();
        }
    }

    /// Writes a matrix in COLLADA's order: one row after another.
    pub fn matrix(&mut self, m: &Matrix4<f32>) {
        // cgmath is column-major; m.x is the first column.
        let rows = [
            m.x.x, m.y.x, m.z.x, m.w.x,
            m.x.y, m.y.y, m.z.y, m.w.y,
            m.x.z, m.y.z, m.z.z, m.w.z,
            m.x.w, m.y.w, m.z.w, m.w.w,
        ];
        // Adding zero turns -0 into 0.
        self.list(rows.iter().map(|&x| x + 0.0));
    }

    pub fn matrices<'a, I>(&mut self, ms: I)
    where I: IntoIterator<Item = &'a Matrix4<f32>> {
        let mut first = true;
        for m in ms {
            if !first {
                self.s.push(' ');
            }
            first = false;
            self.matrix(m);
        }
    }
}

/// Escapes a string for use in text or attribute values.
pub struct Esc<'a>(pub &'a str);

impl<'a> Display for Esc<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                _ => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

macro_rules! xml_attr {
    ($x:ident; ($e:expr) $($rest:tt)*) => {
        $x.push_text(&$e);
        xml_attr!($x; $($rest)*);
    };
    ($x:ident; $strlit:tt $($rest:tt)*) => {
        $x.push_str($strlit);
        xml_attr!($x; $($rest)*);
    };
    ($x:ident;) => {};
}

macro_rules! xml {
    ($x:ident; </ $($rest:tt)*) => {
        $x.start_close_tag();
        xml!($x; $($rest)*)
    };
    ($x:ident; < $($rest:tt)*) => {
        $x.start_open_tag();
        xml!($x; $($rest)*)
    };
    ($x:ident; /> $($rest:tt)*) => {
        $x.end_empty_tag();
        xml!($x; $($rest)*)
    };
    ($x:ident; > $($rest:tt)*) => {
        $x.end_tag();
        xml!($x; $($rest)*)
    };
    ($x:ident; ; $($rest:tt)*) => {
        $x.nl();
        xml!($x; $($rest)*)
    };
    ($x:ident; / $($rest:tt)*) => {
        $x.deindent_and_start_close_tag();
        xml!($x; $($rest)*)
    };
    ($x:ident; $attr:ident = [ $($val:tt)* ] $($rest:tt)*) => {
        $x.push_str(" ");
        $x.push_str(stringify!($attr));
        $x.push_str("=\"");
        xml_attr!($x; $($val)*);
        $x.push_str("\"");
        xml!($x; $($rest)*)
    };
    ($x:ident; if ($cond:expr) { $($then:tt)* } else { $($els:tt)* } $($rest:tt)*) => {
        if $cond {
            xml!($x; $($then)*);
        } else {
            xml!($x; $($els)*);
        }
        xml!($x; $($rest)*);
    };
    ($x:ident; if ($cond:expr) { $($then:tt)* } $($rest:tt)*) => {
        if $cond {
            xml!($x; $($then)*);
        }
        xml!($x; $($rest)*);
    };
    ($x:ident; for $p:pat in ($it:expr) { $($body:tt)* } $($rest:tt)*) => {
        for $p in $it {
            xml!($x; $($body)*);
        }
        xml!($x; $($rest)*);
    };
    ($x:ident; MATRIX($e:expr) $($rest:tt)*) => {
        $x.matrix($e);
        xml!($x; $($rest)*);
    };
    ($x:ident; MATRICES($e:expr) $($rest:tt)*) => {
        $x.matrices($e);
        xml!($x; $($rest)*);
    };
    ($x:ident; LIST($e:expr) $($rest:tt)*) => {
        $x.list($e);
        xml!($x; $($rest)*);
    };
    ($x:ident; $word:ident $($rest:tt)*) => {
        $x.push_str(stringify!($word));
        xml!($x; $($rest)*)
    };
    ($x:ident; ($e:expr) $($rest:tt)*) => {
        $x.push_text(&$e);
        xml!($x; $($rest)*)
    };
    ($x:ident; $strlit:tt $($rest:tt)*) => {
        $x.push_str(&$strlit);
        xml!($x; $($rest)*)
    };
    ($x:ident;) => {};
}

#[test]
fn test_xml_macro() {
    let mut xml = Xml::with_capacity(64);
    let ids = [1, 2, 3];
    xml!(xml;
        <a b=["x"(1)]>;
            <c>LIST(&ids)</c>;
            <d e=[(Esc("<&>"))]/>;
        /a>;
    );
    assert_eq!(xml.string(), concat!(
        "<a b=\"x1\">\n",
        "  <c>1 2 3</c>\n",
        "  <d e=\"&lt;&amp;&gt;\"/>\n",
        "</a>\n",
    ));
}

#[test]
fn test_matrix_order() {
    use cgmath::vec3;
    // A translation has its offset in the last column, so it shows up at
    // the end of each of the first three rows.
    let m = Matrix4::from_translation(vec3(1.0, 2.0, 3.0));
    let mut xml = Xml::with_capacity(64);
    xml.matrix(&m);
    assert_eq!(xml.string(), "1 0 0 1 0 1 0 2 0 0 1 3 0 0 0 1");
}

#[test]
fn test_fork() {
    let mut xml = Xml::with_capacity(64);
    xml!(xml; <a>;);
    let mut inner = xml.fork();
    xml!(inner; <b/>;);
    xml!(xml; <c/>;);
    xml.append(inner);
    xml!(xml; /a>;);
    assert_eq!(xml.string(), "<a>\n  <c/>\n  <b/>\n</a>\n");
}
