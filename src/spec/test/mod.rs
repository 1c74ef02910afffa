pub mod descriptor;
pub mod opcode;
