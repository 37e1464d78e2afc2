error_chain! {
    foreign_links {
        Fmt(::std::fmt::Error);
        Io(::std::io::Error);
        Json(::json::Error);
        TimeFmt(::time::ParseError);
    }

    errors {
        InputNotFound(path: String) {
            description("input file not found")
            display("input file not found: {}", path)
        }
        OutputDirNotFound(path: String) {
            description("output directory not found")
            display("output directory not found: {}", path)
        }
        InvalidOutputPath(path: String) {
            description("invalid output path")
            display("invalid output path: {}", path)
        }
        BadScene(msg: String) {
            description("malformed scene description")
            display("malformed scene description: {}", msg)
        }
        NonInvertible(what: String) {
            description("matrix is not invertible")
            display("matrix is not invertible: {}", what)
        }
        JointAttachmentWeighted(node: String) {
            description("mesh attached under a joint has vertex weights")
            display("mesh on node {} is attached under a joint and has vertex weights", node)
        }
        JointAttachmentMorphed(node: String) {
            description("mesh attached under a joint has morph targets")
            display("mesh on node {} is attached under a joint and has morph targets", node)
        }
        MeshNotIndexed(node: String, attachment: usize) {
            description("mesh missing from the mesh index")
            display("mesh attachment {} of node {} is not in the mesh index", attachment, node)
        }
        BoneOutOfRange(mesh: String, bone: usize) {
            description("vertex weight references a missing bone")
            display("{} has a vertex weight for bone {}, which does not exist", mesh, bone)
        }
    }
}

impl Error {
    /// Whether the error was caused by how the tool was invoked (as opposed to
    /// a broken scene or a bug).
    pub fn is_user_error(&self) -> bool {
        match *self.kind() {
            ErrorKind::InputNotFound(_) |
            ErrorKind::OutputDirNotFound(_) |
            ErrorKind::InvalidOutputPath(_) |
            ErrorKind::BadScene(_) |
            ErrorKind::Json(_) => true,
            _ => false,
        }
    }
}

macro_rules! check {
    ($b:expr, $($fmt:tt)*) => {
        if !$b {
            Err(::errors::Error::from_kind(
                ::errors::ErrorKind::BadScene(format!($($fmt)*))
            ))
        } else {
            Ok(())
        }
    };
}
