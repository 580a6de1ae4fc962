//! Built-in animation scripts for a couple of classic teaching
//! visuals, expressed as declarative frame data.
//!
//! Rendering to media is a collaborator concern (see
//! [`crate::collab::AnimationRenderer`]); this module only builds the
//! scripts. Coordinates assume a 640x480 canvas.

use crate::collab::{AnimationRenderer, ScriptFileRenderer};
use crate::config::Config;
use crate::models::{AnimationScript, DrawCommand, Frame};
use crate::store::SubjectStore;

const CLIENT_X: i32 = 120;
const SERVER_X: i32 = 520;

fn actor_columns() -> Vec<DrawCommand> {
    vec![
        DrawCommand::Text {
            content: "Client".into(),
            position: [CLIENT_X - 30, 40],
        },
        DrawCommand::Text {
            content: "Server".into(),
            position: [SERVER_X - 30, 40],
        },
        DrawCommand::Line {
            from: [CLIENT_X, 60],
            to: [CLIENT_X, 440],
            color: "#888888".into(),
        },
        DrawCommand::Line {
            from: [SERVER_X, 60],
            to: [SERVER_X, 440],
            color: "#888888".into(),
        },
    ]
}

fn segment(label: &str, y: i32, left_to_right: bool, color: &str) -> Vec<DrawCommand> {
    let (from_x, to_x) = if left_to_right {
        (CLIENT_X, SERVER_X)
    } else {
        (SERVER_X, CLIENT_X)
    };
    vec![
        DrawCommand::Arrow {
            from: [from_x, y],
            to: [to_x, y],
            color: color.into(),
        },
        DrawCommand::Text {
            content: label.into(),
            position: [(CLIENT_X + SERVER_X) / 2 - 40, y - 15],
        },
    ]
}

/// The TCP three-way handshake: SYN, SYN-ACK, ACK between two
/// timelines, one exchange per frame, ending on an established state.
pub fn tcp_handshake_script() -> AnimationScript {
    let mut frames = Vec::new();

    frames.push(Frame {
        duration_frames: 30,
        commands: actor_columns(),
    });

    let mut syn = actor_columns();
    syn.extend(segment("SYN (seq=x)", 140, true, "#2266cc"));
    frames.push(Frame {
        duration_frames: 45,
        commands: syn,
    });

    let mut syn_ack = actor_columns();
    syn_ack.extend(segment("SYN (seq=x)", 140, true, "#2266cc"));
    syn_ack.extend(segment("SYN-ACK (seq=y, ack=x+1)", 220, false, "#22aa44"));
    frames.push(Frame {
        duration_frames: 45,
        commands: syn_ack,
    });

    let mut ack = actor_columns();
    ack.extend(segment("SYN (seq=x)", 140, true, "#2266cc"));
    ack.extend(segment("SYN-ACK (seq=y, ack=x+1)", 220, false, "#22aa44"));
    ack.extend(segment("ACK (ack=y+1)", 300, true, "#2266cc"));
    ack.push(DrawCommand::Text {
        content: "Connection established".into(),
        position: [220, 380],
    });
    frames.push(Frame {
        duration_frames: 60,
        commands: ack,
    });

    AnimationScript {
        title: "TCP Three-Way Handshake".into(),
        topic: "TCP".into(),
        fps: 30,
        frames,
    }
}

fn stack_cells(values: &[&str]) -> Vec<DrawCommand> {
    let mut commands = vec![DrawCommand::Text {
        content: "Stack (top first)".into(),
        position: [260, 40],
    }];
    for (i, value) in values.iter().enumerate() {
        let top = 80 + (i as i32) * 60;
        commands.push(DrawCommand::Rectangle {
            top_left: [250, top],
            bottom_right: [390, top + 50],
            color: "#cc8822".into(),
        });
        commands.push(DrawCommand::Text {
            content: (*value).into(),
            position: [305, top + 30],
        });
    }
    commands
}

/// Stack push/pop: three pushes then a pop, drawn as a growing and
/// shrinking column of cells with the operation labeled per frame.
pub fn stack_operations_script() -> AnimationScript {
    let states: [(&str, &[&str]); 5] = [
        ("start: empty stack", &[]),
        ("push(A)", &["A"]),
        ("push(B)", &["B", "A"]),
        ("push(C)", &["C", "B", "A"]),
        ("pop() -> C", &["B", "A"]),
    ];

    let frames = states
        .iter()
        .map(|(label, values)| {
            let mut commands = stack_cells(values);
            commands.push(DrawCommand::Text {
                content: (*label).into(),
                position: [240, 440],
            });
            Frame {
                duration_frames: 45,
                commands,
            }
        })
        .collect();

    AnimationScript {
        title: "Stack Operations".into(),
        topic: "Stack".into(),
        fps: 30,
        frames,
    }
}

/// Which built-in script `stu animation` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    TcpHandshake,
    StackOperations,
}

impl AnimationKind {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "tcp_handshake" => Ok(AnimationKind::TcpHandshake),
            "stack_operations" => Ok(AnimationKind::StackOperations),
            other => anyhow::bail!(
                "Unknown animation: '{}'. Use tcp_handshake or stack_operations.",
                other
            ),
        }
    }

    pub fn script(self) -> AnimationScript {
        match self {
            AnimationKind::TcpHandshake => tcp_handshake_script(),
            AnimationKind::StackOperations => stack_operations_script(),
        }
    }
}

pub fn run_animation(
    config: &Config,
    subject: Option<&str>,
    kind: AnimationKind,
) -> anyhow::Result<()> {
    let store = SubjectStore::from_config(config);
    let subject_name = store.resolve(subject)?;
    let subject = store.load(&subject_name)?;

    let script = kind.script();
    let renderer = ScriptFileRenderer {
        out_dir: store.animations_dir(&subject.slug),
    };
    let path = renderer.render(&script)?;

    println!("animation {} ({})", script.title, subject_name);
    println!("  frames: {}", script.frames.len());
    println!("  script: {}", path.display());
    println!("ok");
    Ok(())
}
