use serde::Deserialize;

use clap::Args;

#[derive(Clone, Debug, Default, Deserialize, Args)]
pub struct ConfigOption {
    /// Emit a 32-bit mode root.
    #[clap(name = "32", long = "32")]
    pub mode_32: bool,

    /// Emit a 64-bit mode root.
    #[clap(name = "64", long = "64")]
    pub mode_64: bool,

    /// Keep entries flagged as undocumented.
    #[clap(long = "with-undoc")]
    pub with_undoc: bool,

    /// Instruction spec file, one opcode/descriptor pair per line.
    #[clap(name = "spec")]
    pub spec: String,

    /// Output: decode mnemonic list (FD_MNEMONIC).
    #[clap(name = "decode-mnems")]
    pub decode_mnems: String,

    /// Output: decode table C fragment.
    #[clap(name = "decode-table")]
    pub decode_table: String,

    /// Output: encode mnemonic list (FE_MNEMONIC).
    #[clap(name = "encode-mnems")]
    pub encode_mnems: String,

    /// Output: encode descriptor records.
    #[clap(name = "encode-table")]
    pub encode_table: String,
}

#[derive(Clone, Debug, Args)]
#[clap(name = "generate")]
pub struct Action {
    #[clap(flatten)]
    pub value: ConfigOption,
}
