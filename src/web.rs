/// Embedded single-page UI served at `/`.
///
/// The script is the browser twin of [`crate::view::SummaryView`]: same
/// state transitions, same labels, talking to `/ws` with the JSON envelope
/// from [`crate::events`].
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Video Summarizer</title>
<style>
*{margin:0;padding:0;box-sizing:border-box}
body{background:#0d1117;color:#c9d1d9;font-family:'Cascadia Code','Fira Code',monospace;min-height:100vh;display:flex;flex-direction:column}
header{padding:16px 24px;border-bottom:1px solid #21262d}
header h1{font-size:1.2rem;color:#58a6ff}
.controls{display:flex;gap:10px;padding:12px 24px;flex-wrap:wrap;align-items:end;border-bottom:1px solid #21262d;background:#161b22}
.field{display:flex;flex-direction:column;gap:3px}
.field label{font-size:.7rem;color:#8b949e;text-transform:uppercase;letter-spacing:.5px}
.field input,.field select,.field textarea{background:#0d1117;border:1px solid #30363d;color:#c9d1d9;padding:6px 10px;border-radius:6px;font-family:inherit;font-size:.85rem}
.field input:focus,.field select:focus,.field textarea:focus{outline:none;border-color:#58a6ff}
.field input[type=text]{min-width:360px}
.field textarea{min-width:360px;min-height:34px;resize:vertical}
.btn{border:none;padding:6px 14px;border-radius:6px;font-family:inherit;font-size:.85rem;cursor:pointer;color:#fff}
.btn-go{background:#238636}.btn-go:hover{background:#2ea043}
.btn-go:disabled{background:#21262d;color:#484f58;cursor:not-allowed}
.hidden{display:none}
#status{padding:8px 24px;font-size:.85rem;color:#e3b341;background:#161b22;border-bottom:1px solid #21262d}
#status.error{color:#f85149;background:#200d0d}
#loading{padding:8px 24px;font-size:.85rem;color:#8b949e;animation:pulse 1.2s ease-in-out infinite}
@keyframes pulse{0%,100%{opacity:1}50%{opacity:.4}}
#result{flex:1;padding:20px 24px;line-height:1.8;font-size:1rem;white-space:pre-wrap;word-wrap:break-word}
</style>
</head>
<body>
<header><h1>Video Summarizer</h1></header>
<div class="controls">
  <div class="field"><label>YouTube URL</label><input type="text" id="youtube-url" placeholder="https://www.youtube.com/watch?v=..."></div>
  <div class="field"><label>Language</label><select id="language"><option value="ko">Korean</option><option value="en">English</option></select></div>
  <div class="field"><label>Length</label><select id="summary-length"><option value="100">100</option><option value="200" selected>200</option><option value="500">500</option><option value="1000">1000</option></select></div>
  <div class="field"><label>Custom prompt (optional)</label><textarea id="prompt" placeholder="Overrides language and length"></textarea></div>
  <button class="btn btn-go" id="summarize-btn">Summarize</button>
</div>
<div id="status" class="hidden"></div>
<div id="loading" class="hidden"></div>
<div id="result"></div>
<script>
const $=s=>document.querySelector(s);
const urlInput=$('#youtube-url'),languageSelect=$('#language'),lengthSelect=$('#summary-length');
const promptInput=$('#prompt'),summarizeBtn=$('#summarize-btn');
const statusDiv=$('#status'),loadingDiv=$('#loading'),resultDiv=$('#result');

/* ---- Socket ---- */
let ws=null,pending=[];
function connect(){
  const s=new WebSocket((location.protocol==='https:'?'wss://':'ws://')+location.host+'/ws');
  ws=s;
  s.onopen=()=>{pending.forEach(f=>s.send(f));pending=[]};
  s.onmessage=m=>{let ev;try{ev=JSON.parse(m.data)}catch(e){return}const h=handlers[ev.event];if(h)h(ev.data)};
  s.onclose=()=>{if(ws!==s)return;ws=null;pending=[];if(waiting)handlers.error('Connection to the server was lost.')};
}
function emit(event,data){
  const frame=JSON.stringify({event,data});
  if(!ws||ws.readyState>=WebSocket.CLOSING)connect();
  if(ws.readyState===WebSocket.OPEN)ws.send(frame);else pending.push(frame);
}
connect();

/* ---- Submit ---- */
let waiting=false;
function submit(){
  if(waiting)return;
  const url=urlInput.value.trim();
  if(!url){alert('Please enter a YouTube URL.');return}
  const req={url};
  const prompt=promptInput.value.trim();
  if(prompt){req.prompt=prompt}else{req.language=languageSelect.value;req.summaryLength=parseInt(lengthSelect.value,10)}
  waiting=true;
  summarizeBtn.disabled=true;
  resultDiv.textContent='';
  statusDiv.classList.add('hidden');
  loadingDiv.textContent='Request sent...';
  loadingDiv.classList.remove('hidden');
  emit('summarize_video',req);
}
summarizeBtn.addEventListener('click',submit);
urlInput.addEventListener('keydown',e=>{if(e.key==='Enter')submit()});

/* ---- Server events ---- */
function idle(){waiting=false;summarizeBtn.disabled=false}
const handlers={
  thinking:()=>{loadingDiv.textContent='AI is analyzing...';loadingDiv.classList.remove('hidden')},
  status:msg=>{statusDiv.textContent=msg;statusDiv.classList.remove('hidden','error');loadingDiv.classList.add('hidden')},
  partial_response:text=>{resultDiv.textContent+=text+'\n'},
  final_response:summary=>{resultDiv.textContent=summary},
  error:err=>{statusDiv.textContent='Error: '+err;statusDiv.classList.add('error');statusDiv.classList.remove('hidden');loadingDiv.classList.add('hidden');idle()},
  done:()=>{idle();loadingDiv.classList.add('hidden');statusDiv.classList.add('hidden')}
};
</script>
</body>
</html>"##;
