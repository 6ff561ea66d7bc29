fn main() {
    nih_plug::nih_export_standalone::<adlib_plugin::AdlibPlugin>();
}
